//! Wire types for the Alertmanager webhook payload and ServiceNow records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alert lifecycle state as reported by Alertmanager.
///
/// Alertmanager only ever sends `firing` or `resolved`; anything else is a
/// malformed payload and rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// The alert condition is active.
    Firing,
    /// The alert condition has cleared.
    Resolved,
}

/// A single alert from an Alertmanager notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Lifecycle state.
    pub status: AlertStatus,
    /// Alert labels. Expected to carry `alertname` and `namespace`; may
    /// carry `close_notes`/`close_code` overrides for the close operation.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Free-form context attached by the alerting rule.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Opaque stable identifier for the alert condition instance.
    #[serde(default)]
    pub fingerprint: String,
    /// When the alert started firing.
    #[serde(rename = "startsAt", default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert ended (zero-value timestamp while still firing).
    #[serde(rename = "endsAt", default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Look up a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// The inbound webhook body: a batch of alerts delivered in one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Ordered batch of alerts. Must be present and non-empty.
    pub alerts: Vec<Alert>,
    /// Labels shared by every alert in the batch.
    #[serde(default)]
    pub common_labels: HashMap<String, String>,
}

/// A ServiceNow incident row, as returned by the Table API.
///
/// Only the fields the bridge reads; everything else on the record is
/// ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Incident {
    /// Opaque record id used for update/close calls.
    pub sys_id: String,
    /// Human-facing incident number (INC0010042 style), for logs.
    #[serde(default)]
    pub number: String,
    /// The identity key the incident was created with.
    #[serde(default)]
    pub short_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alertmanager_payload() {
        let body = r#"{
            "receiver": "snow-bridge",
            "status": "firing",
            "alerts": [{
                "status": "firing",
                "labels": {"alertname": "HighCPU", "namespace": "ns1", "severity": "critical"},
                "annotations": {"summary": "CPU above 90% for 10m"},
                "startsAt": "2024-05-01T10:00:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "fingerprint": "abc123"
            }],
            "commonLabels": {"cluster": "prod"}
        }"#;

        let payload: WebhookPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.alerts.len(), 1);
        assert_eq!(payload.common_labels.get("cluster").unwrap(), "prod");

        let alert = &payload.alerts[0];
        assert_eq!(alert.status, AlertStatus::Firing);
        assert_eq!(alert.label("alertname"), Some("HighCPU"));
        assert_eq!(alert.fingerprint, "abc123");
        assert!(alert.starts_at.is_some());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let body = r#"{"alerts": [{"status": "pending", "labels": {}, "annotations": {}, "fingerprint": "x"}]}"#;
        assert!(serde_json::from_str::<WebhookPayload>(body).is_err());
    }

    #[test]
    fn test_missing_alerts_is_rejected() {
        let body = r#"{"commonLabels": {"cluster": "prod"}}"#;
        assert!(serde_json::from_str::<WebhookPayload>(body).is_err());
    }

    #[test]
    fn test_parse_incident_row() {
        let body = r#"{
            "sys_id": "9d385017c611228701d22104cc95c371",
            "number": "INC0010042",
            "short_description": "HighCPU-ns1-abc123",
            "state": "2",
            "priority": "1"
        }"#;

        let incident: Incident = serde_json::from_str(body).unwrap();
        assert_eq!(incident.sys_id, "9d385017c611228701d22104cc95c371");
        assert_eq!(incident.number, "INC0010042");
    }
}
