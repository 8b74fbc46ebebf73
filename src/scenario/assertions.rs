//! Scenario assertions
//!
//! Pure checks over observed browser state. A failed assertion aborts the
//! remaining sequence; there is no retry or recovery.

use thiserror::Error;

use crate::browser::BrowserError;
use crate::cas::ControlError;

/// Scenario failure types
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Expected URL starting with {expected}, got {actual}")]
    UrlPrefixMismatch { expected: String, actual: String },

    #[error("Element {selector} text {actual:?} does not contain {needle:?}")]
    TextMissing {
        selector: String,
        needle: String,
        actual: String,
    },

    #[error("Browser step failed: {0}")]
    Browser(#[from] BrowserError),

    #[error("Server control failed: {0}")]
    Control(#[from] ControlError),
}

/// Check that a URL starts with the expected prefix
pub fn assert_url_has_prefix(url: &str, prefix: &str) -> Result<(), ScenarioError> {
    if url.starts_with(prefix) {
        Ok(())
    } else {
        Err(ScenarioError::UrlPrefixMismatch {
            expected: prefix.to_string(),
            actual: url.to_string(),
        })
    }
}

/// Check that element text contains the expected substring
pub fn assert_text_contains(text: &str, needle: &str, selector: &str) -> Result<(), ScenarioError> {
    if text.contains(needle) {
        Ok(())
    } else {
        Err(ScenarioError::TextMissing {
            selector: selector.to_string(),
            needle: needle.to_string(),
            actual: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_prefix_match() {
        assert!(assert_url_has_prefix(
            "https://localhost:8444/protected?ticket=ST-1",
            "https://localhost:8444/protected"
        )
        .is_ok());
    }

    #[test]
    fn test_url_prefix_mismatch() {
        // A login redirect must never satisfy the protected-resource check
        let err = assert_url_has_prefix(
            "https://localhost:8443/cas/login?service=https%3A%2F%2Flocalhost%3A8444%2Fprotected",
            "https://localhost:8444/protected",
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::UrlPrefixMismatch { .. }));
        assert!(err.to_string().contains("https://localhost:8444/protected"));
    }

    #[test]
    fn test_login_redirect_prefix_match() {
        assert!(assert_url_has_prefix(
            "https://localhost:8443/cas/login?service=https%3A%2F%2Flocalhost%3A8444%2Fprotected",
            "https://localhost:8443/cas/login?service="
        )
        .is_ok());
    }

    #[test]
    fn test_text_contains() {
        assert!(assert_text_contains("Hello, casuser.", "casuser", "h2 span").is_ok());
    }

    #[test]
    fn test_text_missing() {
        let err = assert_text_contains("Hello, anonymous.", "casuser", "h2 span").unwrap_err();
        assert!(matches!(err, ScenarioError::TextMissing { .. }));
        assert!(err.to_string().contains("h2 span"));
        assert!(err.to_string().contains("casuser"));
    }
}
