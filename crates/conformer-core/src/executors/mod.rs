//! External command execution for driving the container tool.
//!
//! Everything the harness asks of the container runtime goes through a
//! [`CommandRunner`]: one program invocation, bounded by a timeout, reported
//! back as exit code plus captured output. A non-zero exit is returned as data
//! so the caller decides whether it matters.

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::HarnessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HarnessError>;
}

pub mod process;

pub use process::ProcessRunner;
