//! Alert reconciliation engine.
//!
//! Maps each alert's `(match_count, status)` pair onto exactly one incident
//! operation. Alerts in a batch are processed strictly in order with a
//! single shared session, which keeps log lines correlated per alert and
//! rules out two operations racing on the same identity key within a batch.
//! One alert's failure never aborts the rest.

use tracing::{error, info, warn};

use crate::error::BridgeError;
use crate::identity::alert_identity;
use crate::models::{Alert, AlertStatus};
use crate::snow::{ServiceNowClient, Session};

/// Outcome of reconciling a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// No incident existed for a firing alert; one was created.
    Created,
    /// Exactly one incident matched a firing alert; a work note was appended.
    Updated,
    /// Exactly one incident matched a resolved alert; it was closed.
    Closed,
    /// A resolved alert matched nothing. Logged as a warning, not an error.
    NothingToClose,
}

/// Per-alert result, kept in batch order.
#[derive(Debug)]
pub struct AlertOutcome {
    /// Identity key the alert reconciled under.
    pub identity: String,
    /// Fingerprint, for correlating with source alerts.
    pub fingerprint: String,
    /// What happened, or why it did not.
    pub result: Result<ReconcileAction, BridgeError>,
}

/// Summary of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Alerts processed (always the full batch).
    pub processed: usize,
    /// Incidents created.
    pub created: usize,
    /// Incidents that received a work note.
    pub updated: usize,
    /// Incidents closed.
    pub closed: usize,
    /// Resolved alerts with nothing to close.
    pub skipped: usize,
    /// Alerts whose processing failed (query/mutation/ambiguity).
    pub failed: usize,
    /// Per-alert details, in batch order.
    pub outcomes: Vec<AlertOutcome>,
}

/// Reconciler - decides and executes one incident operation per alert.
pub struct Reconciler<'a> {
    client: &'a ServiceNowClient,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over the given client.
    #[must_use]
    pub fn new(client: &'a ServiceNowClient) -> Self {
        Self { client }
    }

    /// Process a batch sequentially using the shared session.
    ///
    /// Session acquisition failure is the caller's concern; by the time a
    /// session exists, everything here is best-effort per alert.
    pub async fn process_batch(&self, session: &Session, alerts: &[Alert]) -> BatchReport {
        let mut report = BatchReport::default();

        for alert in alerts {
            let identity = alert_identity(alert);
            let result = self.process_alert(session, alert, &identity).await;

            match &result {
                Ok(ReconcileAction::Created) => report.created += 1,
                Ok(ReconcileAction::Updated) => report.updated += 1,
                Ok(ReconcileAction::Closed) => report.closed += 1,
                Ok(ReconcileAction::NothingToClose) => report.skipped += 1,
                Err(e) => {
                    error!(
                        identity = %identity,
                        fingerprint = %alert.fingerprint,
                        labels = ?alert.labels,
                        error = %e,
                        "Alert processing failed; continuing with remaining alerts"
                    );
                    report.failed += 1;
                }
            }

            report.processed += 1;
            report.outcomes.push(AlertOutcome {
                identity,
                fingerprint: alert.fingerprint.clone(),
                result,
            });
        }

        info!(
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            closed = report.closed,
            skipped = report.skipped,
            failed = report.failed,
            "Batch reconciliation complete"
        );

        report
    }

    /// Decide and execute exactly one operation for a single alert.
    async fn process_alert(
        &self,
        session: &Session,
        alert: &Alert,
        identity: &str,
    ) -> Result<ReconcileAction, BridgeError> {
        let matches = self.client.find_incidents(session, identity).await?;

        match (matches.len(), alert.status) {
            (0, AlertStatus::Firing) => {
                info!(identity = %identity, "No matching incident; creating");
                self.client.create_incident(session, identity, alert).await?;
                Ok(ReconcileAction::Created)
            }
            (1, AlertStatus::Firing) => {
                info!(
                    identity = %identity,
                    sys_id = %matches[0].sys_id,
                    number = %matches[0].number,
                    "Alert still firing; appending work note"
                );
                self.client
                    .update_incident(session, &matches[0].sys_id, identity, alert)
                    .await?;
                Ok(ReconcileAction::Updated)
            }
            (1, AlertStatus::Resolved) => {
                info!(
                    identity = %identity,
                    sys_id = %matches[0].sys_id,
                    number = %matches[0].number,
                    "Alert resolved; closing incident"
                );
                self.client
                    .close_incident(session, &matches[0].sys_id, identity, alert)
                    .await?;
                Ok(ReconcileAction::Closed)
            }
            (0, AlertStatus::Resolved) => {
                warn!(
                    identity = %identity,
                    fingerprint = %alert.fingerprint,
                    "Resolved alert has no matching incident; nothing to close"
                );
                Ok(ReconcileAction::NothingToClose)
            }
            (count, _) => Err(BridgeError::AmbiguousMatch {
                identity: identity.to_string(),
                count,
            }),
        }
    }
}
