//! CAS endpoint URL construction
//!
//! Derives every URL the scenario touches from two base addresses: the
//! CAS login server and the protected service registered with it.

use serde::{Deserialize, Serialize};

/// Addresses of the CAS deployment under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasEndpoints {
    cas_base: String,
    service_base: String,
    protected_path: String,
}

impl CasEndpoints {
    /// Create endpoints from base URLs, normalizing trailing slashes
    pub fn new(cas_base: &str, service_base: &str, protected_path: &str) -> Self {
        let protected_path = if protected_path.starts_with('/') {
            protected_path.to_string()
        } else {
            format!("/{}", protected_path)
        };

        Self {
            cas_base: cas_base.trim_end_matches('/').to_string(),
            service_base: service_base.trim_end_matches('/').to_string(),
            protected_path,
        }
    }

    /// Check that both base addresses parse as absolute URLs
    pub fn validate(&self) -> Result<(), url::ParseError> {
        url::Url::parse(&self.cas_base)?;
        url::Url::parse(&self.service_base)?;
        Ok(())
    }

    /// CAS server base URL
    pub fn cas_base(&self) -> &str {
        &self.cas_base
    }

    /// Protected service base URL
    pub fn service_base(&self) -> &str {
        &self.service_base
    }

    /// Public entry URL of the protected service
    pub fn entry_url(&self) -> &str {
        &self.service_base
    }

    /// The protected resource on the service
    pub fn protected_url(&self) -> String {
        format!("{}{}", self.service_base, self.protected_path)
    }

    /// CAS login endpoint
    pub fn login_url(&self) -> String {
        format!("{}/cas/login", self.cas_base)
    }

    /// CAS logout endpoint
    pub fn logout_url(&self) -> String {
        format!("{}/cas/logout", self.cas_base)
    }

    /// Prefix of the URL an unauthenticated request to the protected
    /// resource must be redirected to
    pub fn login_redirect_prefix(&self) -> String {
        format!("{}?service=", self.login_url())
    }

    /// The full login redirect for the protected resource, with the
    /// service callback parameter URL-encoded
    pub fn service_callback_url(&self) -> String {
        format!(
            "{}{}",
            self.login_redirect_prefix(),
            urlencoding::encode(&self.protected_url())
        )
    }

    /// Actuator shutdown endpoint for an arbitrary server base
    pub fn shutdown_url(base: &str) -> String {
        format!("{}/actuator/shutdown", base.trim_end_matches('/'))
    }

    /// Actuator health endpoint for an arbitrary server base
    pub fn health_url(base: &str) -> String {
        format!("{}/actuator/health", base.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> CasEndpoints {
        CasEndpoints::new("https://localhost:8443", "https://localhost:8444", "/protected")
    }

    #[test]
    fn test_derived_urls() {
        let e = endpoints();
        assert_eq!(e.login_url(), "https://localhost:8443/cas/login");
        assert_eq!(e.logout_url(), "https://localhost:8443/cas/logout");
        assert_eq!(e.protected_url(), "https://localhost:8444/protected");
        assert_eq!(e.entry_url(), "https://localhost:8444");
    }

    #[test]
    fn test_login_redirect_prefix() {
        assert_eq!(
            endpoints().login_redirect_prefix(),
            "https://localhost:8443/cas/login?service="
        );
    }

    #[test]
    fn test_service_callback_is_url_encoded() {
        assert_eq!(
            endpoints().service_callback_url(),
            "https://localhost:8443/cas/login?service=https%3A%2F%2Flocalhost%3A8444%2Fprotected"
        );
    }

    #[test]
    fn test_trailing_slash_and_missing_leading_slash_normalized() {
        let e = CasEndpoints::new("https://localhost:8443/", "https://localhost:8444/", "protected");
        assert_eq!(e.protected_url(), "https://localhost:8444/protected");
        assert_eq!(e.login_url(), "https://localhost:8443/cas/login");
    }

    #[test]
    fn test_actuator_urls() {
        assert_eq!(
            CasEndpoints::shutdown_url("https://localhost:8444"),
            "https://localhost:8444/actuator/shutdown"
        );
        assert_eq!(
            CasEndpoints::health_url("https://localhost:8444/"),
            "https://localhost:8444/actuator/health"
        );
    }

    #[test]
    fn test_validate() {
        assert!(endpoints().validate().is_ok());
        let bad = CasEndpoints::new("not a url", "https://localhost:8444", "/protected");
        assert!(bad.validate().is_err());
    }
}
