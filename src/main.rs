//! cas-probe - Single-Logout Acceptance Probe
//!
//! Drives a headless browser against a running CAS deployment and exits
//! non-zero if any step or expectation fails.
//!
//! Environment variables:
//! - `CAS_PROBE_CAS_URL` - CAS server base URL (default: "https://localhost:8443")
//! - `CAS_PROBE_SERVICE_URL` - Protected service base URL (default: "https://localhost:8444")
//! - `CAS_PROBE_USERNAME` / `CAS_PROBE_PASSWORD` - Test user credentials
//! - `CAS_PROBE_CHROME` - Chrome/Chromium executable path
//! - `CAS_PROBE_HEADLESS` - Override headless mode ("true"/"false")
//! - `CAS_PROBE_TIMEOUT_SECS` - Step timeout in seconds

use tracing::{error, info};

use cas_probe::scenario::SingleLogoutScenario;
use cas_probe::ProbeConfig;

fn apply_env_overrides(config: &mut ProbeConfig) {
    if let Ok(url) = std::env::var("CAS_PROBE_CAS_URL") {
        config.cas_base_url = url;
    }
    if let Ok(url) = std::env::var("CAS_PROBE_SERVICE_URL") {
        config.service_base_url = url;
    }
    if let Ok(user) = std::env::var("CAS_PROBE_USERNAME") {
        config.username = user;
    }
    if let Ok(pass) = std::env::var("CAS_PROBE_PASSWORD") {
        config.password = pass;
    }
    if let Ok(path) = std::env::var("CAS_PROBE_CHROME") {
        config.chrome_path = Some(path);
    }
    if let Some(headless) = std::env::var("CAS_PROBE_HEADLESS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.headless = headless;
    }
    if let Some(timeout) = std::env::var("CAS_PROBE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.timeout_secs = timeout;
    }
}

#[tokio::main]
async fn main() {
    let _guard = cas_probe::init_logging();

    info!("Starting cas-probe");

    if let Some(dir) = cas_probe::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let mut config = ProbeConfig::load();
    apply_env_overrides(&mut config);

    // No display means headless is the only option
    let has_display = std::env::var("DISPLAY").map(|d| !d.is_empty()).unwrap_or(false);
    if !has_display && !config.headless {
        info!("No DISPLAY available - forcing headless=true");
        config.headless = true;
        config.save();
    }

    let endpoints = config.endpoints();
    if let Err(e) = endpoints.validate() {
        error!("Invalid server base URL in config: {}", e);
        std::process::exit(1);
    }

    info!("CAS server: {}", endpoints.cas_base());
    info!("Protected service: {}", endpoints.protected_url());

    let scenario = SingleLogoutScenario::new(config);

    match scenario.run().await {
        Ok(report) => {
            info!(
                "Single logout scenario PASSED in {} ms ({} navigations)",
                report.total_ms, report.navigations
            );
            for step in &report.steps {
                info!("  {} - {} ms", step.name, step.elapsed_ms);
            }
        }
        Err(e) => {
            error!("Single logout scenario FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
