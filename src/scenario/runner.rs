//! Single-logout scenario
//!
//! Drives the fixed step sequence against a running CAS server and its
//! protected service: log in through the browser, verify the session on
//! the service, log out, and verify that re-requesting the protected
//! resource demands re-authentication.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use super::{assert_text_contains, assert_url_has_prefix, ScenarioError};
use crate::browser::{BrowserSession, BrowserSessionConfig};
use crate::cas::{CasActions, CasControlClient, CasEndpoints, Credentials};
use crate::ProbeConfig;

/// One timed step of a scenario run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub name: String,
    pub elapsed_ms: u64,
}

/// Outcome of a successful scenario run
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub steps: Vec<StepRecord>,
    pub total_ms: u64,
    pub navigations: u64,
}

impl ScenarioReport {
    fn record(&mut self, name: &str, started: Instant) {
        self.steps.push(StepRecord {
            name: name.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
    }
}

/// The single-logout acceptance scenario
pub struct SingleLogoutScenario {
    config: ProbeConfig,
    endpoints: CasEndpoints,
    credentials: Credentials,
}

impl SingleLogoutScenario {
    /// Build the scenario from probe configuration
    pub fn new(config: ProbeConfig) -> Self {
        let endpoints = config.endpoints();
        let credentials = config.credentials();
        Self {
            config,
            endpoints,
            credentials,
        }
    }

    /// Endpoints the scenario will drive
    pub fn endpoints(&self) -> &CasEndpoints {
        &self.endpoints
    }

    fn control_client(&self) -> Result<CasControlClient, ScenarioError> {
        let mut control = CasControlClient::new(self.config.timeout_secs)?;
        if let (Some(user), Some(pass)) =
            (&self.config.control_username, &self.config.control_password)
        {
            control = control.with_basic_auth(user, pass);
        }
        Ok(control)
    }

    /// Run the full sequence.
    ///
    /// The browser session is closed in all paths, pass or fail, before
    /// the result is returned.
    pub async fn run(&self) -> Result<ScenarioReport, ScenarioError> {
        let control = self.control_client()?;

        // Single pre-flight probe; the scenario itself is the arbiter, so
        // an unreachable health endpoint only gets logged.
        match control.health(self.endpoints.service_base()).await {
            Ok(true) => info!("Protected service reports UP"),
            Ok(false) => warn!("Protected service health is not UP"),
            Err(e) => warn!("Protected service health probe failed: {}", e),
        }

        let unique_id = Uuid::new_v4().to_string()[..8].to_string();
        let session_config = BrowserSessionConfig::for_session(&unique_id)
            .headless(self.config.headless)
            .chrome_path(self.config.chrome_path.clone())
            .timeout(self.config.timeout_secs);

        let session = Arc::new(BrowserSession::new(session_config).await?);

        let result = self.run_steps(&session, &control).await;

        if result.is_err() && !session.is_alive() {
            warn!("Browser disconnected during the run");
        }
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        result
    }

    async fn run_steps(
        &self,
        session: &Arc<BrowserSession>,
        control: &CasControlClient,
    ) -> Result<ScenarioReport, ScenarioError> {
        let mut report = ScenarioReport::default();
        let started = Instant::now();

        // Public entry page, then the protected resource; the service
        // bounces the unauthenticated browser to the CAS login form.
        let t = Instant::now();
        session.navigate(self.endpoints.entry_url()).await?;
        report.record("open-entry-page", t);

        let t = Instant::now();
        session.navigate(&self.endpoints.protected_url()).await?;
        report.record("request-protected-resource", t);

        let t = Instant::now();
        CasActions::login_with(session, &self.credentials).await?;
        CasActions::log_page(session).await?;
        report.record("login", t);

        // Back on the service: the browser must have landed on the
        // protected resource, showing the authenticated user.
        let t = Instant::now();
        let url = session.current_url().await?;
        assert_url_has_prefix(&url, &self.endpoints.protected_url())?;
        let identity = CasActions::identity_text(session).await?;
        assert_text_contains(&identity, &self.credentials.username, CasActions::IDENTITY_DISPLAY)?;
        info!("Authenticated view verified for {}", self.credentials.username);
        report.record("verify-authenticated-view", t);

        let t = Instant::now();
        CasActions::goto_logout(session, &self.endpoints).await?;
        report.record("logout", t);

        // Re-requesting the protected resource must now demand a fresh
        // login, with the service callback pointing back at the resource.
        let passes = if self.config.verify_logout_repeat { 2 } else { 1 };
        for pass in 1..=passes {
            let t = Instant::now();
            session.navigate(&self.endpoints.protected_url()).await?;
            CasActions::wait_for_login_form(session).await?;
            CasActions::log_page(session).await?;
            let url = session.current_url().await?;
            assert_url_has_prefix(&url, &self.endpoints.login_redirect_prefix())?;
            report.record(
                if pass == 1 {
                    "verify-login-challenge"
                } else {
                    "verify-login-challenge-repeat"
                },
                t,
            );
        }
        info!("Logout verified: protected resource demands re-authentication");

        if self.config.shutdown_after_run {
            let t = Instant::now();
            control.shutdown(self.endpoints.service_base()).await?;
            report.record("shutdown-server", t);
        }

        report.total_ms = started.elapsed().as_millis() as u64;
        report.navigations = session.navigation_count();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_endpoints_from_config() {
        let scenario = SingleLogoutScenario::new(ProbeConfig::default());
        assert_eq!(
            scenario.endpoints().protected_url(),
            "https://localhost:8444/protected"
        );
        assert_eq!(
            scenario.endpoints().login_redirect_prefix(),
            "https://localhost:8443/cas/login?service="
        );
    }

    #[test]
    fn test_report_records_steps_in_order() {
        let mut report = ScenarioReport::default();
        report.record("open-entry-page", Instant::now());
        report.record("login", Instant::now());
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[0].name, "open-entry-page");
        assert_eq!(report.steps[1].name, "login");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ScenarioReport {
            steps: vec![StepRecord {
                name: "login".to_string(),
                elapsed_ms: 12,
            }],
            total_ms: 12,
            navigations: 3,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"elapsedMs\":12"));
        assert!(json.contains("\"totalMs\":12"));
    }
}
