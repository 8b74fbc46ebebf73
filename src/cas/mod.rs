//! CAS server helpers
//!
//! URL construction for the CAS login/logout endpoints, the interactive
//! login flow driven through the browser, and the out-of-band control
//! client for the server's actuator endpoints.

mod actions;
mod control;
mod endpoints;
mod types;

pub use actions::CasActions;
pub use control::CasControlClient;
pub use endpoints::CasEndpoints;
pub use types::{ControlError, Credentials};
