//! ServiceNow Table API client.
//!
//! Covers the three touchpoints the bridge needs: the OAuth password-grant
//! token endpoint, incident lookup by identity key, and incident
//! create/update/close. The instance is treated as a black box behind its
//! REST contract; nothing about ticket storage is assumed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, Credentials};
use crate::error::{truncate_body, BridgeError};
use crate::models::{Alert, Incident};

/// Result cap for identity lookups. Anything above one match is already a
/// terminal branch, the cap only bounds response size.
const QUERY_LIMIT: &str = "10";

/// Incident state value for a resolved ticket.
const CLOSED_STATE: u8 = 6;

/// Close fields used when the alert does not override them via
/// `labels.close_notes` / `labels.close_code`.
const DEFAULT_CLOSE_NOTES: &str = "Closed automatically: source alert resolved";
const DEFAULT_CLOSE_CODE: &str = "Resolved by request";

/// A short-lived authenticated context, valid for one inbound batch.
///
/// Never cached or reused across requests; the reconciliation engine owns
/// it for the duration of batch processing and drops it afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token returned by the token endpoint.
    pub access_token: String,
    /// When the token was issued to us.
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Envelope the Table API wraps list responses in.
#[derive(Debug, Deserialize)]
struct TableResponse {
    #[serde(default)]
    result: Vec<Incident>,
}

/// Envelope for single-record responses (create/update).
#[derive(Debug, Deserialize)]
struct RecordResponse {
    result: Incident,
}

#[derive(Debug, Serialize)]
struct IncidentCreate {
    short_description: String,
    description: String,
    work_notes: String,
}

#[derive(Debug, Serialize)]
struct IncidentUpdate {
    work_notes: String,
}

#[derive(Debug, Serialize)]
struct IncidentClose {
    work_notes: String,
    state: u8,
    close_notes: String,
    close_code: String,
}

/// ServiceNow Table API client.
#[derive(Debug, Clone)]
pub struct ServiceNowClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceNowClient {
    /// Create a new client for the configured instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.instance_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange credentials for a bearer token via the password grant.
    ///
    /// A 2xx response whose body lacks a non-empty `access_token` is still
    /// a failure; some instances return 200 with an error body.
    pub async fn acquire_session(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, BridgeError> {
        let url = format!("{}/oauth_token.do", self.base_url);

        debug!(url = %url, username = %credentials.username, "Acquiring ServiceNow session");

        let form = [
            ("grant_type", "password"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| BridgeError::Auth {
                detail: format!("transport error: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(BridgeError::Auth {
                detail: format!("token endpoint returned {status}: {}", truncate_body(&body)),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| BridgeError::Auth {
            detail: format!("unparseable token response: {e}"),
        })?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(Session {
                access_token,
                acquired_at: Utc::now(),
            }),
            _ => Err(BridgeError::Auth {
                detail: format!("no access_token in response: {}", truncate_body(&body)),
            }),
        }
    }

    /// Find incidents whose short description equals the identity key.
    pub async fn find_incidents(
        &self,
        session: &Session,
        identity: &str,
    ) -> Result<Vec<Incident>, BridgeError> {
        let url = format!("{}/api/now/table/incident", self.base_url);

        debug!(identity = %identity, "Searching for matching incidents");

        let response = self
            .client
            .get(&url)
            .query(&[("sysparm_limit", QUERY_LIMIT), ("short_description", identity)])
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| BridgeError::Query {
                identity: identity.to_string(),
                detail: format!("transport error: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Query {
                identity: identity.to_string(),
                detail: format!("table API returned {status}: {}", truncate_body(&body)),
            });
        }

        let table: TableResponse = response.json().await.map_err(|e| BridgeError::Query {
            identity: identity.to_string(),
            detail: format!("unparseable table response: {e}"),
        })?;

        debug!(
            identity = %identity,
            matches = table.result.len(),
            "Incident search complete"
        );

        Ok(table.result)
    }

    /// Create a new incident for a firing alert.
    pub async fn create_incident(
        &self,
        session: &Session,
        identity: &str,
        alert: &Alert,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/api/now/table/incident", self.base_url);

        let body = IncidentCreate {
            short_description: identity.to_string(),
            description: pretty_json(alert),
            work_notes: work_note(alert),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| mutation_error("create", identity, format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(mutation_error(
                "create",
                identity,
                format!("table API returned {status}: {}", truncate_body(&text)),
            ));
        }

        match response.json::<RecordResponse>().await {
            Ok(record) => info!(
                identity = %identity,
                sys_id = %record.result.sys_id,
                number = %record.result.number,
                "Incident created"
            ),
            Err(e) => debug!(
                identity = %identity,
                error = %e,
                "Incident created but response body was unparseable"
            ),
        }

        Ok(())
    }

    /// Append a work note to an existing incident. The description is left
    /// untouched; tickets are annotated on repeat firing, not re-described.
    pub async fn update_incident(
        &self,
        session: &Session,
        sys_id: &str,
        identity: &str,
        alert: &Alert,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/api/now/table/incident/{sys_id}", self.base_url);

        let body = IncidentUpdate {
            work_notes: work_note(alert),
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&session.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| mutation_error("update", identity, format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(mutation_error(
                "update",
                identity,
                format!("table API returned {status}: {}", truncate_body(&text)),
            ));
        }

        info!(identity = %identity, sys_id = %sys_id, "Incident updated");
        Ok(())
    }

    /// Close an incident for a resolved alert, setting the terminal state
    /// and close fields. Alert-supplied `close_notes`/`close_code` labels
    /// take precedence over the defaults.
    pub async fn close_incident(
        &self,
        session: &Session,
        sys_id: &str,
        identity: &str,
        alert: &Alert,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/api/now/table/incident/{sys_id}", self.base_url);

        let body = close_body(alert);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&session.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| mutation_error("close", identity, format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(mutation_error(
                "close",
                identity,
                format!("table API returned {status}: {}", truncate_body(&text)),
            ));
        }

        info!(identity = %identity, sys_id = %sys_id, "Incident closed");
        Ok(())
    }
}

fn mutation_error(operation: &'static str, identity: &str, detail: String) -> BridgeError {
    BridgeError::Mutation {
        operation,
        identity: identity.to_string(),
        detail,
    }
}

/// Pretty-printed alert payload for the incident description.
fn pretty_json(alert: &Alert) -> String {
    serde_json::to_string_pretty(alert).unwrap_or_else(|_| "{}".to_string())
}

/// Work-note text appended on every operation.
fn work_note(alert: &Alert) -> String {
    let annotations =
        serde_json::to_string_pretty(&alert.annotations).unwrap_or_else(|_| "{}".to_string());
    format!("New alert received. Annotations: {annotations}")
}

fn close_body(alert: &Alert) -> IncidentClose {
    IncidentClose {
        work_notes: work_note(alert),
        state: CLOSED_STATE,
        close_notes: alert
            .label("close_notes")
            .unwrap_or(DEFAULT_CLOSE_NOTES)
            .to_string(),
        close_code: alert
            .label("close_code")
            .unwrap_or(DEFAULT_CLOSE_CODE)
            .to_string(),
    }
}
