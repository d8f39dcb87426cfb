//! HTTP server for Alertmanager webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::WebhookPayload;
use crate::reconcile::Reconciler;
use crate::snow::ServiceNowClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// ServiceNow Table API client.
    pub snow: ServiceNowClient,
}

/// Build the HTTP router for the bridge.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(alertmanager_webhook))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint. Not ready until credentials are configured.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if !state.config.is_configured() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Handle an inbound Alertmanager notification.
///
/// Returns 200 once the batch reached processing, even when individual
/// alerts failed; those are logged with enough context for manual
/// reconciliation. Only payload-shape problems (400) and session
/// acquisition failures (500) surface as non-200.
async fn alertmanager_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "error": format!("invalid payload: {e}")
                })),
            );
        }
    };

    if payload.alerts.is_empty() {
        warn!("Rejecting webhook with empty alerts array");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "error": "alerts must be a non-empty array"
            })),
        );
    }

    info!(
        alert_count = payload.alerts.len(),
        common_labels = ?payload.common_labels,
        "Received Alertmanager notification"
    );

    // One session per batch; without it nothing downstream can run.
    let session = match state
        .snow
        .acquire_session(&state.config.credentials)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Session acquisition failed; batch not processed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "error": e.to_string()
                })),
            );
        }
    };

    let report = Reconciler::new(&state.snow)
        .process_batch(&session, &payload.alerts)
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "processed",
            "processed": report.processed,
            "created": report.created,
            "updated": report.updated,
            "closed": report.closed,
            "skipped": report.skipped,
            "failed": report.failed
        })),
    )
}
