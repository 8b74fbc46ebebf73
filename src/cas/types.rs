//! CAS client types
//!
//! Credentials for the interactive login and errors for the out-of-band
//! control endpoints.

use serde::{Deserialize, Serialize};

/// Login credentials for the CAS test user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        // The stock test account CAS overlays ship with
        Self {
            username: "casuser".to_string(),
            password: "Mellon".to_string(),
        }
    }
}

/// Control endpoint error types
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Control endpoint {url} returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_credentials() {
        let creds = Credentials::default();
        assert_eq!(creds.username, "casuser");
        assert_eq!(creds.password, "Mellon");
    }

    #[test]
    fn test_unexpected_status_message() {
        let err = ControlError::UnexpectedStatus {
            url: "https://localhost:8444/actuator/shutdown".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("/actuator/shutdown"));
    }
}
