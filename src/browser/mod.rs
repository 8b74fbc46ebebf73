//! Browser automation module
//!
//! Handles launching and controlling a headless Chromium instance used to
//! drive the authentication server and the protected service under test.

mod errors;
mod session;

pub use errors::BrowserError;
pub use session::{BrowserSession, BrowserSessionConfig};
