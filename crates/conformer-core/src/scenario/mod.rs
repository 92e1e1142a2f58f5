//! Declarative conformance scenarios
//!
//! A [`Scenario`] is an ordered list of protocol steps plus what the logs must
//! look like afterwards. Scenarios carry no behaviour of their own; the
//! [`runner::ScenarioRunner`] executes them against a fresh container each.

use serde_json::Value;

use crate::core_types::EnvironmentSet;
use crate::logs::is_blank;
use crate::protocol::{InitRequest, RunRequest, RunResult};

pub mod config;
pub mod runner;
pub mod suite;


pub use config::{ScenarioConfig, SuiteConfig};
pub use runner::{ScenarioOutcome, ScenarioReport, ScenarioRunner};
pub use suite::base_suite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusExpectation {
    /// Exactly 200.
    Ok,
    /// Anything but 200.
    NotOk,
    Any,
}

impl StatusExpectation {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusExpectation::Ok => status == 200,
            StatusExpectation::NotOk => status != 200,
            StatusExpectation::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub status: StatusExpectation,
    /// Compared for strict equality with the decoded response body.
    pub body: Option<Value>,
}

impl Expectation {
    pub fn ok() -> Self {
        Self {
            status: StatusExpectation::Ok,
            body: None,
        }
    }

    pub fn not_ok() -> Self {
        Self {
            status: StatusExpectation::NotOk,
            body: None,
        }
    }

    pub fn any() -> Self {
        Self {
            status: StatusExpectation::Any,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn check(&self, result: &RunResult) -> Result<(), String> {
        if !self.status.matches(result.status) {
            return Err(format!(
                "expected status {:?}, got {} with body {}",
                self.status,
                result.status,
                describe_body(result.body.as_ref())
            ));
        }
        if let Some(expected) = &self.body {
            if result.body.as_ref() != Some(expected) {
                return Err(format!(
                    "expected body {}, got {}",
                    expected,
                    describe_body(result.body.as_ref())
                ));
            }
        }
        Ok(())
    }
}

fn describe_body(body: Option<&Value>) -> String {
    body.map_or_else(|| "<empty>".to_string(), Value::to_string)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Init { request: InitRequest, expect: Expectation },
    /// An init call with a body the typed request cannot express.
    InitRaw { body: Value, expect: Expectation },
    Run { request: RunRequest, expect: Expectation },
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Init { .. } | Step::InitRaw { .. } => "init",
            Step::Run { .. } => "run",
        }
    }

    pub fn expectation(&self) -> &Expectation {
        match self {
            Step::Init { expect, .. } | Step::InitRaw { expect, .. } | Step::Run { expect, .. } => {
                expect
            }
        }
    }
}

/// Content assertions applied to the sentinel-free streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCheck {
    StdoutEmpty,
    StderrEmpty,
    StdoutContains(String),
    StderrContains(String),
    /// Either stream, or the two concatenated, contains the text.
    CombinedContains(String),
    StdoutContainsIgnoreCase(String),
}

impl StreamCheck {
    pub fn evaluate(&self, stdout: &str, stderr: &str) -> Result<(), String> {
        let holds = match self {
            StreamCheck::StdoutEmpty => is_blank(stdout),
            StreamCheck::StderrEmpty => is_blank(stderr),
            StreamCheck::StdoutContains(text) => stdout.contains(text.as_str()),
            StreamCheck::StderrContains(text) => stderr.contains(text.as_str()),
            StreamCheck::CombinedContains(text) => format!("{}{}", stdout, stderr).contains(text.as_str()),
            StreamCheck::StdoutContainsIgnoreCase(text) => {
                stdout.to_lowercase().contains(&text.to_lowercase())
            }
        };
        if holds {
            return Ok(());
        }
        Err(match self {
            StreamCheck::StdoutEmpty => "expected stdout to be empty after sentinel filter".to_string(),
            StreamCheck::StderrEmpty => "expected stderr to be empty after sentinel filter".to_string(),
            StreamCheck::StdoutContains(text) | StreamCheck::StdoutContainsIgnoreCase(text) => {
                format!("expected stdout to contain '{}'", text)
            }
            StreamCheck::StderrContains(text) => format!("expected stderr to contain '{}'", text),
            StreamCheck::CombinedContains(text) => format!("expected output to contain '{}'", text),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    /// Injected as container environment at launch.
    pub container_env: EnvironmentSet,
    pub steps: Vec<Step>,
    /// Sentinels expected on each stream once all steps have run.
    pub sentinel_count: usize,
    pub stream_checks: Vec<StreamCheck>,
    /// Set when the scenario should be reported as skipped instead of run.
    pub skip: Option<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_env: EnvironmentSet::new(),
            steps: Vec::new(),
            sentinel_count: 1,
            stream_checks: Vec::new(),
            skip: None,
        }
    }

    pub fn with_container_env(mut self, env: EnvironmentSet) -> Self {
        self.container_env = env;
        self
    }

    pub fn init(mut self, request: InitRequest, expect: Expectation) -> Self {
        self.steps.push(Step::Init { request, expect });
        self
    }

    pub fn init_raw(mut self, body: Value, expect: Expectation) -> Self {
        self.steps.push(Step::InitRaw { body, expect });
        self
    }

    pub fn run(mut self, request: RunRequest, expect: Expectation) -> Self {
        self.steps.push(Step::Run { request, expect });
        self
    }

    pub fn expect_sentinels(mut self, count: usize) -> Self {
        self.sentinel_count = count;
        self
    }

    pub fn check_streams(mut self, check: StreamCheck) -> Self {
        self.stream_checks.push(check);
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }
}
