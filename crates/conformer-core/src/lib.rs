//! Conformance harness for action containers.
//!
//! An action container is a runtime image that receives user code through
//! `POST /init` and executes it through `POST /run`, printing a sentinel line
//! to stdout and stderr at the end of every activation. This crate launches
//! such images through a container CLI, drives them over HTTP and checks both
//! the responses and the captured logs against a suite of scenarios.
//!
//! # Architecture Overview
//!
//! - **Process runner** (`executors`): async command execution with a hard timeout
//! - **Container lifecycle** (`container`): naming, launch, address resolution,
//!   log capture and guaranteed teardown
//! - **Protocol client** (`protocol`): typed `/init` and `/run` calls
//! - **Log verification** (`logs`): sentinel counting and stream predicates
//! - **Scenarios** (`scenario`): the declarative model, its runner and the base suite
//! - **Configuration** (`config`): tool discovery and networking strategy

pub mod config;
pub mod container;
pub mod core_types;
pub mod errors;
pub mod executors;
pub mod logs;
pub mod protocol;
pub mod scenario;

pub use config::{HarnessConfig, NetworkMode, ToolCommand};
pub use container::{ContainerHandle, ContainerManager, ContainerSession};
pub use core_types::EnvironmentSet;
pub use errors::{HarnessError, VerificationFailure};
pub use executors::{CommandOutput, CommandRunner, ProcessRunner};
pub use logs::{check_streams, LogCapture, ACTIVATION_LOG_SENTINEL};
pub use protocol::{ActionClient, InitRequest, RunRequest, RunResult};
pub use scenario::{base_suite, Scenario, ScenarioOutcome, ScenarioReport, ScenarioRunner, SuiteConfig};

#[cfg(test)]
pub mod test_utils;
