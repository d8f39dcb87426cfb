//! Alert identity derivation.

use crate::models::Alert;

/// Derive the stable identity key for an alert.
///
/// The key is `alertname-namespace-fingerprint`. It doubles as the incident
/// short description, which is what lookups match on, so the same alert
/// condition maps to the same incident whether it is firing or resolved.
///
/// A missing `alertname` or `namespace` label contributes a literal empty
/// segment. The degraded key is still deterministic, which keeps lookup
/// continuity: a resolved alert can find the incident its firing
/// counterpart created under the same degraded key.
#[must_use]
pub fn alert_identity(alert: &Alert) -> String {
    let alertname = alert.label("alertname").unwrap_or_default();
    let namespace = alert.label("namespace").unwrap_or_default();
    format!("{alertname}-{namespace}-{}", alert.fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertStatus;
    use std::collections::HashMap;

    fn alert(status: AlertStatus, labels: &[(&str, &str)], fingerprint: &str) -> Alert {
        Alert {
            status,
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            annotations: HashMap::new(),
            fingerprint: fingerprint.to_string(),
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_identity_format() {
        let a = alert(
            AlertStatus::Firing,
            &[("alertname", "HighCPU"), ("namespace", "ns1")],
            "abc123",
        );
        assert_eq!(alert_identity(&a), "HighCPU-ns1-abc123");
    }

    #[test]
    fn test_identity_constant_across_lifecycle() {
        let labels = [("alertname", "PodCrashLooping"), ("namespace", "payments")];
        let firing = alert(AlertStatus::Firing, &labels, "f00d");
        let resolved = alert(AlertStatus::Resolved, &labels, "f00d");
        assert_eq!(alert_identity(&firing), alert_identity(&resolved));
    }

    #[test]
    fn test_missing_labels_degrade_deterministically() {
        let a = alert(AlertStatus::Firing, &[], "abc123");
        assert_eq!(alert_identity(&a), "--abc123");

        let b = alert(AlertStatus::Firing, &[("alertname", "HighCPU")], "abc123");
        assert_eq!(alert_identity(&b), "HighCPU--abc123");
    }
}
