//! Browser session management
//!
//! Handles launching and controlling a Chromium instance over the
//! DevTools protocol. Sessions run against locally deployed servers with
//! self-signed certificates, so certificate errors are tolerated by default.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::BrowserError;

/// Global counter for sequential session naming (Probe-1, Probe-2, ...)
static PROBE_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Find a Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![
            std::path::PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            std::path::PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Configuration for a browser session
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSessionConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// User data directory
    pub user_data_dir: Option<String>,
    /// Accept invalid/self-signed TLS certificates
    pub accept_invalid_certs: bool,
    /// Step timeout in seconds (navigation and element waits)
    pub timeout_secs: u64,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for BrowserSessionConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            user_data_dir: None,
            accept_invalid_certs: true,
            timeout_secs: 60,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl BrowserSessionConfig {
    /// Create config for a specific session with its own data directory
    pub fn for_session(session_id: &str) -> Self {
        let base = std::env::temp_dir().join("cas-probe").join("browser_data");

        let user_data_dir = base.join(session_id).to_string_lossy().to_string();

        Self {
            user_data_dir: Some(user_data_dir),
            ..Default::default()
        }
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }

    /// Set step timeout
    pub fn timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set whether self-signed TLS certificates are accepted
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Build the chromiumoxide launch configuration from a session config.
///
/// Kept separate from the launch path so the flag set can be verified
/// without starting a browser.
fn build_browser_config(config: &BrowserSessionConfig) -> Result<BrowserConfig, BrowserError> {
    let mut builder = BrowserConfig::builder();

    if config.headless {
        // Modern Chrome requires --headless=new for proper headless
        builder = builder.headless_mode(HeadlessMode::New);
    } else {
        builder = builder.with_head();
    }

    // Set Chrome path if specified (or use auto-detected path)
    if let Some(ref path) = config.chrome_path {
        builder = builder.chrome_executable(path);
    } else if let Some(chrome_path) = find_chrome() {
        debug!("Auto-detected Chrome at: {}", chrome_path.display());
        builder = builder.chrome_executable(chrome_path);
    }

    // Set user data directory
    if let Some(ref dir) = config.user_data_dir {
        std::fs::create_dir_all(dir)?;
        builder = builder.user_data_dir(dir);
    }

    // The servers under test run with self-signed certificates on localhost
    if config.accept_invalid_certs {
        builder = builder
            .arg("--ignore-certificate-errors")
            .arg("--allow-insecure-localhost");
    }

    builder = builder
        .arg("--no-default-browser-check")
        .arg("--disable-session-crashed-bubble")
        .arg("--disable-notifications")
        // Required when running as root (e.g., in Docker or on a CI box)
        .arg("--no-sandbox")
        .window_size(config.window_width, config.window_height)
        .request_timeout(Duration::from_secs(config.timeout_secs));

    builder.build().map_err(BrowserError::LaunchFailed)
}

/// A browser session for driving the servers under test
pub struct BrowserSession {
    /// Unique session ID (display name, e.g. "Probe-1")
    pub id: String,
    /// The browser instance
    browser: Arc<RwLock<Option<Browser>>>,
    /// Current active page
    page: Arc<RwLock<Option<Page>>>,
    /// Session configuration
    config: BrowserSessionConfig,
    /// Whether session is alive
    alive: Arc<AtomicBool>,
    /// Number of navigations performed
    navigation_count: Arc<AtomicU64>,
}

impl BrowserSession {
    /// Create a new browser session with the given config
    pub async fn new(config: BrowserSessionConfig) -> Result<Self, BrowserError> {
        let session_id = format!("Probe-{}", PROBE_COUNTER.fetch_add(1, Ordering::Relaxed));

        info!(
            "Launching browser session {} (headless: {})",
            session_id, config.headless
        );

        // Check if Chrome is available before attempting launch
        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(BrowserError::LaunchFailed(
                "Chrome/Chromium not found. Install it or set the chrome path in the config."
                    .to_string(),
            ));
        }

        let browser_config = build_browser_config(&config)?;

        // Launch browser
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Drain CDP events in the background. Handler ended = Chrome
        // disconnected or crashed.
        let session_id_clone = session_id.clone();
        let alive_flag = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive_flag.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Session {} handler error: {}", session_id_clone, e);
                }
            }
            warn!(
                "Session {} Chrome disconnected (event handler ended)",
                session_id_clone
            );
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        // Get existing page or create a new one (Chrome opens with a blank tab).
        // Close any extra tabs so the session holds exactly one page.
        let page = {
            let mut pages = browser
                .pages()
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            let main_page = if !pages.is_empty() {
                pages.remove(0)
            } else {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
            };

            for extra_page in pages {
                debug!("Closing extra blank tab");
                let _ = extra_page.close().await;
            }

            main_page
        };

        info!("Browser session {} created", session_id);

        Ok(Self {
            id: session_id,
            browser: Arc::new(RwLock::new(Some(browser))),
            page: Arc::new(RwLock::new(Some(page))),
            config,
            alive: alive_flag,
            navigation_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Check if the session is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Get navigation count
    pub fn navigation_count(&self) -> u64 {
        self.navigation_count.load(Ordering::Relaxed)
    }

    /// Navigate to a URL and wait for the main-frame navigation to settle
    /// (server-side redirects included)
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        debug!("Session {} navigating to: {}", self.id, url);
        tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            page.goto(url),
        )
        .await
        .map_err(|_| BrowserError::Timeout(format!("Navigation to {} timed out", url)))?
        .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        self.navigation_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Wait for the next navigation to complete (e.g. after a form submit)
    pub async fn wait_for_navigation(&self) -> Result<(), BrowserError> {
        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            page.wait_for_navigation(),
        )
        .await
        .map_err(|_| BrowserError::Timeout("Navigation timeout".into()))?
        .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    /// Get current URL
    pub async fn current_url(&self) -> Result<String, BrowserError> {
        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        page.url()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?
            .ok_or_else(|| BrowserError::ConnectionLost("No URL".into()))
    }

    /// Wait until a selector appears on the page, polling cooperatively.
    /// Fails with a timeout once the session's step timeout elapses.
    pub async fn wait_for_element(&self, selector: &str) -> Result<(), BrowserError> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.timeout_secs);

        loop {
            {
                let page = self.page.read().await;
                let page = page
                    .as_ref()
                    .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

                if page.find_element(selector).await.is_ok() {
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "Element {} did not appear within {}s",
                    selector, self.config.timeout_secs
                )));
            }

            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    /// Read the inner text of the first element matching a selector
    pub async fn inner_text(&self, selector: &str) -> Result<String, BrowserError> {
        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        let element = page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;

        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(text.unwrap_or_default())
    }

    /// Evaluate a JavaScript expression on the page
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        let result = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            page.evaluate(script),
        )
        .await
        .map_err(|_| BrowserError::Timeout(format!("Evaluation timed out: {}", script)))?
        .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Type text into an element using raw CDP keyboard events, with a
    /// human-ish cadence between keystrokes
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        use chromiumoxide::cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType,
        };
        use rand::{Rng, SeedableRng};

        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        // Focus the field first
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))?;
        element.click().await.ok();

        let mut rng = rand::rngs::StdRng::from_entropy();

        for c in text.chars() {
            let key_down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .text(c.to_string())
                .build()
                .unwrap();
            page.execute(key_down)
                .await
                .map_err(|e| BrowserError::JavaScriptError(format!("CDP keyDown failed: {}", e)))?;

            let key_up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .build()
                .unwrap();
            page.execute(key_up)
                .await
                .map_err(|e| BrowserError::JavaScriptError(format!("CDP keyUp failed: {}", e)))?;

            let delay = rng.gen_range(50..150);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        Ok(())
    }

    /// Press Enter via raw CDP key events; submits the focused form
    pub async fn press_enter(&self) -> Result<(), BrowserError> {
        use chromiumoxide::cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType,
        };
        use rand::{Rng, SeedableRng};

        let page = self.page.read().await;
        let page = page
            .as_ref()
            .ok_or_else(|| BrowserError::ConnectionLost("No active page".into()))?;

        let mut rng = rand::rngs::StdRng::from_entropy();
        let delay = rng.gen_range(100..300);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        // rawKeyDown Enter (with full key properties for proper form submission)
        let key_down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .unwrap();
        page.execute(key_down)
            .await
            .map_err(|e| BrowserError::JavaScriptError(format!("CDP Enter keyDown failed: {}", e)))?;

        // char event with \r (triggers form submission in most browsers)
        let char_event = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text("\r")
            .build()
            .unwrap();
        page.execute(char_event)
            .await
            .map_err(|e| BrowserError::JavaScriptError(format!("CDP Enter char failed: {}", e)))?;

        let key_up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .unwrap();
        page.execute(key_up)
            .await
            .map_err(|e| BrowserError::JavaScriptError(format!("CDP Enter keyUp failed: {}", e)))?;

        Ok(())
    }

    /// Close the browser session
    pub async fn close(&self) -> Result<(), BrowserError> {
        // Mark as not alive first to prevent new operations
        self.alive.store(false, Ordering::Relaxed);

        // 1. Close page first (stops navigation/JS execution)
        {
            let mut page = self.page.write().await;
            if let Some(p) = page.take() {
                let _ = p.close().await;
            }
        }

        // 2. Close browser - try graceful close, give it a moment, then force kill
        {
            let mut browser = self.browser.write().await;
            if let Some(mut b) = browser.take() {
                let _ = b.close().await;
                // Brief grace period for Chrome child processes to exit
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = b.kill().await;
            }
        }

        info!("Browser session {} closed", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BrowserSessionConfig::default();
        assert!(config.headless);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.user_data_dir.is_none());
    }

    #[test]
    fn test_for_session_sets_data_dir() {
        let config = BrowserSessionConfig::for_session("abc123_0");
        let dir = config.user_data_dir.expect("data dir should be set");
        assert!(dir.contains("abc123_0"));
        assert!(dir.contains("cas-probe"));
    }

    #[test]
    fn test_builder_methods() {
        let config = BrowserSessionConfig::default()
            .headless(false)
            .timeout(30)
            .accept_invalid_certs(false)
            .chrome_path(Some("/usr/bin/chromium".into()));
        assert!(!config.headless);
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.chrome_path.as_deref(), Some("/usr/bin/chromium"));
    }

    // Structural check only: verify the launch flag set is accepted by the
    // driver without starting an actual browser. An explicit executable
    // path keeps the check independent of what is installed locally.
    #[test]
    fn test_browser_config_builds() {
        let config = BrowserSessionConfig {
            chrome_path: Some("/usr/bin/chromium".to_string()),
            user_data_dir: None,
            ..Default::default()
        };
        assert!(build_browser_config(&config).is_ok());
    }
}
