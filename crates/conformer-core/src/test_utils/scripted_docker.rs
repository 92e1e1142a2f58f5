// src/test_utils/scripted_docker.rs
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::mock_action_container::ActionState;
use crate::core_types::EnvironmentSet;
use crate::errors::HarnessError;
use crate::executors::{CommandOutput, CommandRunner};

/// A container tool that never starts anything. It records every invocation
/// and answers from a script, resetting the attached [`ActionState`] whenever
/// a container is "launched" so each scenario sees a fresh container.
pub struct ScriptedDocker {
    calls: Mutex<Vec<Vec<String>>>,
    state: Arc<Mutex<ActionState>>,
    run_exit: i32,
    inspect_output: String,
    kill_exit: i32,
    info_exit: i32,
}

fn output(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

fn strip_host(args: &[String]) -> &[String] {
    if args.first().map(String::as_str) == Some("--host") && args.len() >= 2 {
        &args[2..]
    } else {
        args
    }
}

impl ScriptedDocker {
    pub fn new() -> Self {
        Self::attached_to(Arc::new(Mutex::new(ActionState::default())))
    }

    pub fn attached_to(state: Arc<Mutex<ActionState>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            state,
            run_exit: 0,
            inspect_output: "'127.0.0.1'\n".to_string(),
            kill_exit: 0,
            info_exit: 0,
        }
    }

    pub fn with_run_exit(mut self, code: i32) -> Self {
        self.run_exit = code;
        self
    }

    pub fn with_inspect_output(mut self, stdout: &str) -> Self {
        self.inspect_output = stdout.to_string();
        self
    }

    pub fn with_kill_exit(mut self, code: i32) -> Self {
        self.kill_exit = code;
        self
    }

    pub fn with_info_exit(mut self, code: i32) -> Self {
        self.info_exit = code;
        self
    }

    pub fn state(&self) -> Arc<Mutex<ActionState>> {
        self.state.clone()
    }

    pub fn raw_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded invocations without the daemon host prefix.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.raw_calls()
            .iter()
            .map(|call| strip_host(call).to_vec())
            .collect()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    fn launch_env(args: &[String]) -> EnvironmentSet {
        args.windows(2)
            .filter(|pair| pair[0] == "-e")
            .filter_map(|pair| pair[1].split_once('='))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedDocker {
    async fn run(
        &self,
        _program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, HarnessError> {
        self.calls.lock().unwrap().push(args.to_vec());
        let args = strip_host(args);

        let reply = match args.first().map(String::as_str) {
            Some("run") if self.run_exit != 0 => output(
                self.run_exit,
                "",
                "docker: Error response from daemon: Conflict.\n",
            ),
            Some("run") => {
                self.state.lock().unwrap().reset(Self::launch_env(args));
                output(0, "4f1c0ffee\n", "")
            }
            Some("inspect") => output(0, self.inspect_output.clone(), ""),
            Some("logs") => {
                let logs = self.state.lock().unwrap().logs.clone();
                output(0, logs.stdout, logs.stderr)
            }
            Some("kill") => output(self.kill_exit, "", ""),
            Some("rm") => output(0, "", ""),
            Some("info") => output(self.info_exit, "", ""),
            _ => output(1, "", "unknown command\n"),
        };
        Ok(reply)
    }
}
