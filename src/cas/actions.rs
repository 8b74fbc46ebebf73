//! Browser-driven CAS interactions
//!
//! The interactive pieces of the scenario: filling the login form,
//! triggering logout, and logging where the browser currently is.

use std::sync::Arc;

use tracing::{debug, info};

use super::{CasEndpoints, Credentials};
use crate::browser::{BrowserError, BrowserSession};

/// CAS login form selectors
mod selectors {
    pub const USERNAME_FIELD: &str = "#username";
    pub const PASSWORD_FIELD: &str = "#password";
}

/// Browser actions against the CAS login UI
pub struct CasActions;

impl CasActions {
    /// Selector for the element the protected service renders the
    /// authenticated username into
    pub const IDENTITY_DISPLAY: &'static str = "div.starter-template h2 span";

    /// Fill the CAS login form and submit it with Enter, waiting for the
    /// resulting navigation. Fails if the form fields do not appear
    /// before the session's wait timeout elapses.
    pub async fn login_with(
        session: &Arc<BrowserSession>,
        credentials: &Credentials,
    ) -> Result<(), BrowserError> {
        info!(
            "Session {} submitting CAS login form as {}",
            session.id(),
            credentials.username
        );

        session.wait_for_element(selectors::USERNAME_FIELD).await?;
        session
            .type_text(selectors::USERNAME_FIELD, &credentials.username)
            .await?;
        session
            .type_text(selectors::PASSWORD_FIELD, &credentials.password)
            .await?;
        session.press_enter().await?;
        session.wait_for_navigation().await?;

        Ok(())
    }

    /// Wait until the CAS login form is on screen
    pub async fn wait_for_login_form(session: &Arc<BrowserSession>) -> Result<(), BrowserError> {
        session.wait_for_element(selectors::USERNAME_FIELD).await
    }

    /// Read the username the protected service displays for the
    /// authenticated session
    pub async fn identity_text(session: &Arc<BrowserSession>) -> Result<String, BrowserError> {
        session.wait_for_element(Self::IDENTITY_DISPLAY).await?;
        session.inner_text(Self::IDENTITY_DISPLAY).await
    }

    /// Navigate to the CAS logout endpoint
    pub async fn goto_logout(
        session: &Arc<BrowserSession>,
        endpoints: &CasEndpoints,
    ) -> Result<(), BrowserError> {
        debug!("Session {} logging out", session.id());
        session.navigate(&endpoints.logout_url()).await
    }

    /// Log the current page URL and title
    pub async fn log_page(session: &Arc<BrowserSession>) -> Result<(), BrowserError> {
        let url = session.current_url().await?;
        let title = session.evaluate("document.title").await?;
        info!(
            "Session {} at {} ({})",
            session.id(),
            url,
            title.as_str().unwrap_or("")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(selectors::USERNAME_FIELD, "#username");
        assert_eq!(selectors::PASSWORD_FIELD, "#password");
        assert_eq!(CasActions::IDENTITY_DISPLAY, "div.starter-template h2 span");
    }
}
