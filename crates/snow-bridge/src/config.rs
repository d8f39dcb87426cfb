//! Configuration for the bridge service.
//!
//! Everything is read from the environment exactly once, in [`Config::default`],
//! and then passed by reference. Core logic never touches ambient state, so
//! tests can inject fake credentials and endpoints.

use std::env;

/// ServiceNow credentials for the password-grant token exchange.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Instance user the incidents are created as.
    pub username: String,
    /// Instance user password.
    pub password: String,
}

/// Bridge service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Base URL of the ServiceNow instance.
    pub instance_url: String,
    /// Credentials used to acquire a session per batch.
    pub credentials: Credentials,
    /// Whether to verify the instance TLS certificate.
    pub verify_tls: bool,
    /// Timeout for outbound ServiceNow calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("BRIDGE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            instance_url: env::var("SN_INSTANCE_URL").unwrap_or_default(),
            credentials: Credentials {
                client_id: env::var("CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("CLIENT_SECRET").unwrap_or_default(),
                username: env::var("SN_USERNAME").unwrap_or_default(),
                password: env::var("SN_PASSWORD").unwrap_or_default(),
            },
            // Validation stays on unless explicitly opted out.
            verify_tls: env::var("SN_VERIFY_TLS")
                .map(|v| !(v == "false" || v == "0"))
                .unwrap_or(true),
            timeout_secs: env::var("SN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Config {
    /// Names of required settings that are missing or empty.
    ///
    /// Missing credentials do not stop the process; every batch fails at
    /// session acquisition until they are provided.
    #[must_use]
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.instance_url.is_empty() {
            missing.push("SN_INSTANCE_URL");
        }
        if self.credentials.client_id.is_empty() {
            missing.push("CLIENT_ID");
        }
        if self.credentials.client_secret.is_empty() {
            missing.push("CLIENT_SECRET");
        }
        if self.credentials.username.is_empty() {
            missing.push("SN_USERNAME");
        }
        if self.credentials.password.is_empty() {
            missing.push("SN_PASSWORD");
        }
        missing
    }

    /// Whether every required setting is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.missing_settings().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "BRIDGE_PORT",
        "SN_INSTANCE_URL",
        "CLIENT_ID",
        "CLIENT_SECRET",
        "SN_USERNAME",
        "SN_PASSWORD",
        "SN_VERIFY_TLS",
        "SN_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
        assert!(!config.is_configured());
        assert_eq!(
            config.missing_settings(),
            vec![
                "SN_INSTANCE_URL",
                "CLIENT_ID",
                "CLIENT_SECRET",
                "SN_USERNAME",
                "SN_PASSWORD"
            ]
        );
    }

    #[test]
    fn test_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("BRIDGE_PORT", "9000");
        env::set_var("SN_INSTANCE_URL", "https://dev0001.service-now.com");
        env::set_var("CLIENT_ID", "client");
        env::set_var("CLIENT_SECRET", "secret");
        env::set_var("SN_USERNAME", "svc-bridge");
        env::set_var("SN_PASSWORD", "hunter2");
        env::set_var("SN_VERIFY_TLS", "false");
        env::set_var("SN_TIMEOUT_SECS", "10");

        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.instance_url, "https://dev0001.service-now.com");
        assert_eq!(config.credentials.username, "svc-bridge");
        assert!(!config.verify_tls);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.is_configured());

        clear_env();
    }

    #[test]
    fn test_verify_tls_requires_explicit_opt_out() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("SN_VERIFY_TLS", "no");
        assert!(Config::default().verify_tls);

        env::set_var("SN_VERIFY_TLS", "0");
        assert!(!Config::default().verify_tls);

        clear_env();
    }
}
