//! Per-runtime scenario data
//!
//! Each runtime under test supplies the action source for the base scenarios
//! together with a few flags describing what the runtime is allowed to print.
//! These are plain data; all behaviour lives in [`super::suite`].

use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_ENTRY_POINT;

fn default_main() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub code: String,
    #[serde(default = "default_main")]
    pub main: String,
    /// Fail when anything besides sentinels reaches stdout.
    #[serde(default = "default_true")]
    pub enforce_empty_output_stream: bool,
    /// Fail when anything besides sentinels reaches stderr.
    #[serde(default = "default_true")]
    pub enforce_empty_error_stream: bool,
    /// Carried with the runtime data; no base scenario reads it.
    #[serde(default)]
    pub has_code_stub: bool,
    /// Escape hatch: skips scenarios the runtime cannot support, or relaxes
    /// the stderr expectation of the echo scenario.
    #[serde(default)]
    pub skip_test: bool,
}

impl ScenarioConfig {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            main: default_main(),
            enforce_empty_output_stream: true,
            enforce_empty_error_stream: true,
            has_code_stub: false,
            skip_test: false,
        }
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    pub fn allow_output(mut self) -> Self {
        self.enforce_empty_output_stream = false;
        self
    }

    pub fn allow_errors(mut self) -> Self {
        self.enforce_empty_error_stream = false;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip_test = true;
        self
    }
}

/// Scenario data for one runtime. A missing entry leaves that scenario out of
/// the suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    #[serde(default)]
    pub not_returning_json: Option<ScenarioConfig>,
    #[serde(default)]
    pub init_cannot_be_called_more_than_once: Option<ScenarioConfig>,
    #[serde(default)]
    pub entry_point_other_than_main: Option<ScenarioConfig>,
    #[serde(default)]
    pub echo: Option<ScenarioConfig>,
    #[serde(default)]
    pub unicode: Option<ScenarioConfig>,
    #[serde(default)]
    pub env: Option<ScenarioConfig>,
    #[serde(default)]
    pub env_parameters: Option<ScenarioConfig>,
    #[serde(default)]
    pub large_input: Option<ScenarioConfig>,
}
