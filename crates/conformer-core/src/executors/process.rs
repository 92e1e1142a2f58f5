// src/executors/process.rs
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{CommandOutput, CommandRunner};
use crate::errors::HarnessError;

/// Runs commands as real OS processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HarnessError> {
        let command_line = display_command(program, args);
        log::debug!("Executing: {}", command_line);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let timeout_future = tokio::time::sleep(timeout);

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::select! {
            res = child.wait_with_output() => res.map_err(|source| HarnessError::Spawn {
                program: program.to_string(),
                source,
            })?,
            _ = timeout_future => {
                log::warn!("Command timed out after {:?}: {}", timeout, command_line);
                return Err(HarnessError::Timeout {
                    command: command_line,
                    timeout,
                });
            }
        };

        // Killed by a signal: there is no exit code to report.
        let exit_code = output.status.code().unwrap_or(-1);
        log::debug!("Command exited with {}: {}", exit_code, command_line);

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
