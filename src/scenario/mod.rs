//! Scenario runner
//!
//! The single-logout acceptance sequence and its assertions.

mod assertions;
mod runner;

pub use assertions::{assert_text_contains, assert_url_has_prefix, ScenarioError};
pub use runner::{ScenarioReport, SingleLogoutScenario, StepRecord};
