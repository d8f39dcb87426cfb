//! Error taxonomy for the bridge.

use thiserror::Error;

/// Bytes of a remote response body kept in error messages.
const MAX_BODY_BYTES: usize = 512;

/// Errors raised while reconciling a batch.
///
/// Only [`BridgeError::Auth`] aborts the whole batch; the rest are recovered
/// per alert by logging and moving on. Nothing is retried here, the alert
/// source re-fires and re-delivers on its own schedule.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Session acquisition failed. Fatal for the whole batch.
    #[error("session acquisition failed: {detail}")]
    Auth {
        /// Remote status and truncated body, or the transport error.
        detail: String,
    },

    /// Incident lookup failed for one alert.
    #[error("incident query failed for {identity}: {detail}")]
    Query {
        /// Identity key the lookup was for.
        identity: String,
        /// Remote status and truncated body, or the transport error.
        detail: String,
    },

    /// Incident create/update/close failed for one alert.
    #[error("incident {operation} failed for {identity}: {detail}")]
    Mutation {
        /// Which operation was attempted.
        operation: &'static str,
        /// Identity key the mutation was for.
        identity: String,
        /// Remote status and truncated body, or the transport error.
        detail: String,
    },

    /// More than one incident matched the identity key. Mutating any of
    /// them risks picking the wrong ticket, so none are touched.
    #[error("{count} incidents match identity {identity}; refusing to mutate")]
    AmbiguousMatch {
        /// Identity key with multiple matches.
        identity: String,
        /// How many incidents matched.
        count: usize,
    },
}

impl BridgeError {
    /// Whether this error aborts the whole batch rather than one alert.
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Truncate a remote response body for inclusion in error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_is_batch_fatal() {
        let auth = BridgeError::Auth {
            detail: "401".to_string(),
        };
        assert!(auth.is_batch_fatal());

        let query = BridgeError::Query {
            identity: "HighCPU-ns1-abc123".to_string(),
            detail: "timeout".to_string(),
        };
        assert!(!query.is_batch_fatal());

        let ambiguous = BridgeError::AmbiguousMatch {
            identity: "HighCPU-ns1-abc123".to_string(),
            count: 2,
        };
        assert!(!ambiguous.is_batch_fatal());
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = BridgeError::Mutation {
            operation: "close",
            identity: "HighCPU-ns1-abc123".to_string(),
            detail: "table API returned 403".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("close"));
        assert!(msg.contains("HighCPU-ns1-abc123"));
        assert!(msg.contains("403"));
    }

    #[test]
    fn test_truncate_body_short_passthrough() {
        assert_eq!(truncate_body("{\"error\":\"x\"}"), "{\"error\":\"x\"}");
    }

    #[test]
    fn test_truncate_body_long() {
        let body = "x".repeat(2000);
        let truncated = truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(512)));
        assert!(truncated.ends_with("(2000 bytes total)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(600);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("bytes total"));
    }
}
