//! cas-probe
//!
//! Browser-driven acceptance probe for CAS deployments: logs a test user
//! in through a protected service, logs out, and verifies that the
//! protected resource demands re-authentication afterwards.

pub mod browser;
pub mod cas;
pub mod scenario;

use std::path::PathBuf;

use tracing::{error, info, warn};

use cas::{CasEndpoints, Credentials};

/// Probe configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConfig {
    /// CAS login server base URL
    pub cas_base_url: String,
    /// Protected service base URL
    pub service_base_url: String,
    /// Path of the protected resource on the service
    pub protected_path: String,

    /// Test user credentials
    pub username: String,
    pub password: String,

    /// Run the browser in headless mode
    pub headless: bool,
    /// Path to Chrome/Chromium executable (auto-detected when unset)
    #[serde(default)]
    pub chrome_path: Option<String>,
    /// Step timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Re-check the login challenge a second time after logout
    #[serde(default = "default_true")]
    pub verify_logout_repeat: bool,
    /// Ask the service to shut down after a successful run
    #[serde(default = "default_true")]
    pub shutdown_after_run: bool,

    /// Basic auth for the actuator endpoints, when the deployment
    /// protects them
    #[serde(default)]
    pub control_username: Option<String>,
    #[serde(default)]
    pub control_password: Option<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cas_base_url: "https://localhost:8443".to_string(),
            service_base_url: "https://localhost:8444".to_string(),
            protected_path: "/protected".to_string(),
            username: "casuser".to_string(),
            password: "Mellon".to_string(),
            headless: true,
            chrome_path: None,
            timeout_secs: default_timeout_secs(),
            verify_logout_repeat: true,
            shutdown_after_run: true,
            control_username: None,
            control_password: None,
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cas-probe").join("logs"))
}

impl ProbeConfig {
    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cas-probe").join("config.json"))
    }

    /// Load config from file
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => match serde_json::from_str(&content) {
                        Ok(config) => {
                            info!("Loaded config from {:?}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file: {}", e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file: {}", e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!("Failed to create config directory: {}", e);
                    return;
                }
            }

            match serde_json::to_string_pretty(self) {
                Ok(content) => {
                    if let Err(e) = std::fs::write(&path, content) {
                        error!("Failed to save config: {}", e);
                    } else {
                        info!("Config saved to {:?}", path);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize config: {}", e);
                }
            }
        }
    }

    /// Endpoints derived from the configured base URLs
    pub fn endpoints(&self) -> CasEndpoints {
        CasEndpoints::new(&self.cas_base_url, &self.service_base_url, &self.protected_path)
    }

    /// Credentials for the interactive login
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

/// Initialize logging: console layer plus a non-blocking daily rolling
/// file layer when a log directory is available
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "cas-probe.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.cas_base_url, "https://localhost:8443");
        assert_eq!(config.service_base_url, "https://localhost:8444");
        assert_eq!(config.protected_path, "/protected");
        assert_eq!(config.username, "casuser");
        assert!(config.headless);
        assert!(config.verify_logout_repeat);
        assert!(config.shutdown_after_run);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ProbeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"casBaseUrl\""));
        assert!(json.contains("\"serviceBaseUrl\""));
        assert!(json.contains("\"verifyLogoutRepeat\""));

        let parsed: ProbeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cas_base_url, config.cas_base_url);
        assert_eq!(parsed.timeout_secs, config.timeout_secs);
    }

    #[test]
    fn test_config_optional_fields_default() {
        // Older config files without the newer keys still parse
        let json = r#"{
            "casBaseUrl": "https://localhost:8443",
            "serviceBaseUrl": "https://localhost:8444",
            "protectedPath": "/protected",
            "username": "casuser",
            "password": "Mellon",
            "headless": true
        }"#;
        let config: ProbeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert!(config.verify_logout_repeat);
        assert!(config.control_username.is_none());
    }

    #[test]
    fn test_endpoints_from_config() {
        let config = ProbeConfig::default();
        let endpoints = config.endpoints();
        assert_eq!(endpoints.protected_url(), "https://localhost:8444/protected");
        assert!(endpoints.validate().is_ok());
    }
}
