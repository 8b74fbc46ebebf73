//! Out-of-band server control client
//!
//! Talks to the actuator endpoints the test deployment exposes: remote
//! shutdown after a run, and a health probe. This bypasses the browser
//! entirely; the servers use self-signed certificates, so certificate
//! validation is relaxed.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{CasEndpoints, ControlError};

/// Actuator health payload
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the server's actuator control endpoints
pub struct CasControlClient {
    client: Client,
    basic_auth: Option<(String, String)>,
}

impl CasControlClient {
    /// Create a new control client with the given request timeout
    pub fn new(timeout_secs: u64) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("cas-probe/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ControlError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            basic_auth: None,
        })
    }

    /// Send basic auth on control requests
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// Ask the server at `base_url` to shut down
    pub async fn shutdown(&self, base_url: &str) -> Result<(), ControlError> {
        let url = CasEndpoints::shutdown_url(base_url);
        info!("Requesting server shutdown: {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some((user, pass)) = &self.basic_auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ControlError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        info!("Server at {} acknowledged shutdown", base_url);
        Ok(())
    }

    /// Check whether the server at `base_url` reports itself healthy
    pub async fn health(&self, base_url: &str) -> Result<bool, ControlError> {
        let url = CasEndpoints::health_url(base_url);
        debug!("Probing server health: {}", url);

        let mut request = self.client.get(&url);
        if let Some((user, pass)) = &self.basic_auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ControlError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ControlError::InvalidResponse(e.to_string()))?;

        Ok(health.status == "UP")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(CasControlClient::new(30).is_ok());
    }

    #[test]
    fn test_health_payload_parses() {
        let health: HealthResponse = serde_json::from_str(r#"{"status":"UP"}"#).unwrap();
        assert_eq!(health.status, "UP");
    }
}
