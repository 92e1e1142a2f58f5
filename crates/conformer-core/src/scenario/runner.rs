// src/scenario/runner.rs
use futures_util::{stream, StreamExt, TryStreamExt};

use super::{Scenario, Step};
use crate::config::NetworkMode;
use crate::container::{ContainerManager, ContainerSession};
use crate::errors::HarnessError;
use crate::logs::check_streams;
use crate::protocol::RunResult;

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOutcome {
    Passed,
    /// Every failed expectation, in the order it was observed.
    Failed(Vec<String>),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: ScenarioOutcome,
    /// Responses of the steps that were executed.
    pub results: Vec<RunResult>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, ScenarioOutcome::Failed(_))
    }
}

/// Runs scenarios against one image, each in its own container.
pub struct ScenarioRunner {
    manager: ContainerManager,
    image: String,
}

impl ScenarioRunner {
    pub fn new(manager: ContainerManager, image: impl Into<String>) -> Self {
        Self {
            manager,
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Runs one scenario and reports on it.
    ///
    /// Step and log failures become a failed report. Only errors that make
    /// every further scenario pointless, such as a missing container tool,
    /// are returned as `Err`.
    pub async fn run(&self, scenario: &Scenario) -> Result<ScenarioReport, HarnessError> {
        if let Some(reason) = &scenario.skip {
            log::info!("Skipping scenario '{}': {}", scenario.name, reason);
            return Ok(ScenarioReport {
                name: scenario.name.clone(),
                outcome: ScenarioOutcome::Skipped(reason.clone()),
                results: Vec::new(),
            });
        }

        log::info!("Running scenario '{}' against {}", scenario.name, self.image());
        let executed = self
            .manager
            .with_container(&self.image, &scenario.container_env, |session| {
                execute(session, scenario)
            })
            .await;

        let report = match executed {
            Ok(Execution {
                error: Some(e), ..
            }) if e.is_fatal() => return Err(e),
            Ok(Execution {
                results,
                mut failures,
                error,
            }) => {
                failures.extend(error.map(|e| e.to_string()));
                let outcome = if failures.is_empty() {
                    ScenarioOutcome::Passed
                } else {
                    ScenarioOutcome::Failed(failures)
                };
                ScenarioReport {
                    name: scenario.name.clone(),
                    outcome,
                    results,
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => ScenarioReport {
                name: scenario.name.clone(),
                outcome: ScenarioOutcome::Failed(vec![e.to_string()]),
                results: Vec::new(),
            },
        };

        match &report.outcome {
            ScenarioOutcome::Failed(failures) => {
                log::warn!("Scenario '{}' failed: {}", report.name, failures.join("; "))
            }
            _ => log::info!("Scenario '{}' passed", report.name),
        }
        Ok(report)
    }

    /// Runs `scenarios` with at most `jobs` containers alive at a time and
    /// returns the reports in input order.
    ///
    /// Published-port mode binds a single host port, so it always runs
    /// sequentially.
    pub async fn run_suite(
        &self,
        scenarios: &[Scenario],
        jobs: usize,
    ) -> Result<Vec<ScenarioReport>, HarnessError> {
        let jobs = match self.manager.config().network {
            NetworkMode::PublishedPort { .. } if jobs > 1 => {
                log::warn!("Published-port networking shares one host port; running scenarios sequentially");
                1
            }
            _ => jobs.max(1),
        };

        stream::iter(scenarios)
            .map(|scenario| self.run(scenario))
            .buffered(jobs)
            .try_collect()
            .await
    }
}

/// What happened inside one container. `error` is set when a harness error
/// cut the scenario short; `results` then holds the steps that completed.
struct Execution {
    results: Vec<RunResult>,
    failures: Vec<String>,
    error: Option<HarnessError>,
}

async fn execute(session: ContainerSession, scenario: &Scenario) -> Result<Execution, HarnessError> {
    let mut execution = Execution {
        results: Vec::with_capacity(scenario.steps.len()),
        failures: Vec::new(),
        error: None,
    };
    let client = session.client();

    for (index, step) in scenario.steps.iter().enumerate() {
        let call = match step {
            Step::Init { request, .. } => client.init(request).await,
            Step::InitRaw { body, .. } => client.init_raw(body).await,
            Step::Run { request, .. } => client.run(request).await,
        };
        let result = match call {
            Ok(result) => result,
            Err(e) => {
                execution.error = Some(e);
                return Ok(execution);
            }
        };
        log::debug!(
            "Scenario '{}' step {} ({} {}) answered {}",
            scenario.name,
            index + 1,
            step.label(),
            client.base_url(),
            result.status
        );
        if let Err(message) = step.expectation().check(&result) {
            execution
                .failures
                .push(format!("step {} ({}): {}", index + 1, step.label(), message));
        }
        execution.results.push(result);
    }

    let capture = match session.logs().await {
        Ok(capture) => capture,
        Err(e) => {
            execution.error = Some(e);
            return Ok(execution);
        }
    };
    let verified = check_streams(&capture, scenario.sentinel_count, |stdout, stderr| {
        scenario
            .stream_checks
            .iter()
            .try_for_each(|check| check.evaluate(stdout, stderr))
    });
    if let Err(failure) = verified {
        log::debug!(
            "Logs of {}:\n--- stdout ---\n{}\n--- stderr ---\n{}",
            session.identity(),
            capture.stdout,
            capture.stderr
        );
        execution.failures.push(HarnessError::from(failure).to_string());
    }

    Ok(execution)
}
