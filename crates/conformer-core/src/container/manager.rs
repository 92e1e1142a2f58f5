// src/container/manager.rs
use futures_util::FutureExt;
use std::future::Future;
use std::net::Ipv4Addr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{clean_ip_address, container_identity, ContainerHandle};
use crate::config::{HarnessConfig, NetworkMode};
use crate::core_types::EnvironmentSet;
use crate::errors::HarnessError;
use crate::executors::{CommandOutput, CommandRunner, ProcessRunner};
use crate::logs::LogCapture;
use crate::protocol::ActionClient;

const IP_ADDRESS_FORMAT: &str = "{{.NetworkSettings.IPAddress}}";

/// Provisions one container per scenario through the container tool and
/// guarantees it is removed again.
#[derive(Clone)]
pub struct ContainerManager {
    runner: Arc<dyn CommandRunner>,
    config: Arc<HarnessConfig>,
}

impl ContainerManager {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: Arc<HarnessConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    async fn tool(&self, subcommand: Vec<String>) -> Result<CommandOutput, HarnessError> {
        let args = self.config.tool.args(subcommand);
        self.runner
            .run(&self.config.tool.program(), &args, self.config.command_timeout)
            .await
    }

    /// Confirms the container tool can reach its daemon.
    pub async fn check_tool(&self) -> Result<(), HarnessError> {
        let output = self.tool(vec!["info".to_string()]).await?;
        if !output.success() {
            return Err(HarnessError::CommandFailed {
                command: format!("{} info", self.config.tool.program()),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Launches `image` with `env` injected and resolves where it listens.
    ///
    /// The container is given a fixed settle delay after launch; there is no
    /// readiness polling. If launch or address resolution fails, the container
    /// is removed before the error is returned.
    pub async fn provision(
        &self,
        image: &str,
        env: &EnvironmentSet,
    ) -> Result<ContainerHandle, HarnessError> {
        let identity = container_identity(image);

        let mut args = vec!["run".to_string()];
        if let NetworkMode::PublishedPort { host_port, .. } = &self.config.network {
            args.push("-p".to_string());
            args.push(format!("{}:{}", host_port, self.config.container_port));
        }
        args.push("--name".to_string());
        args.push(identity.clone());
        args.extend(env.to_launch_flags());
        args.push("-d".to_string());
        args.push(image.to_string());

        log::info!("Launching container {} from image {}", identity, image);
        let output = match self.tool(args).await {
            Ok(output) => output,
            Err(e) => {
                if !e.is_fatal() {
                    self.remove(&identity).await;
                }
                return Err(e);
            }
        };
        if !output.success() {
            self.remove(&identity).await;
            return Err(HarnessError::Provision {
                identity,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        tokio::time::sleep(self.config.settle_delay).await;

        let (host, port) = match &self.config.network {
            NetworkMode::PublishedPort { host, host_port } => (host.clone(), *host_port),
            NetworkMode::DirectIp => match self.resolve_ip(&identity).await {
                Ok(ip) => (ip, self.config.container_port),
                Err(e) => {
                    self.remove(&identity).await;
                    return Err(e);
                }
            },
        };

        log::info!("Container {} reachable at {}:{}", identity, host, port);
        Ok(ContainerHandle::new(identity, host, port))
    }

    async fn resolve_ip(&self, identity: &str) -> Result<String, HarnessError> {
        let output = self
            .tool(vec![
                "inspect".to_string(),
                "--format".to_string(),
                IP_ADDRESS_FORMAT.to_string(),
                identity.to_string(),
            ])
            .await?;

        if !output.success() {
            return Err(HarnessError::NetworkResolution {
                identity: identity.to_string(),
                reason: format!(
                    "inspect exited with code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }

        let ip = clean_ip_address(&output.stdout);
        if ip.parse::<Ipv4Addr>().is_err() {
            return Err(HarnessError::NetworkResolution {
                identity: identity.to_string(),
                reason: format!("inspect returned no usable IPv4 address: {:?}", output.stdout),
            });
        }
        Ok(ip)
    }

    /// Fetches the container's output so far, split into stdout and stderr.
    pub async fn logs(&self, handle: &ContainerHandle) -> Result<LogCapture, HarnessError> {
        self.fetch_logs(handle.identity()).await
    }

    async fn fetch_logs(&self, identity: &str) -> Result<LogCapture, HarnessError> {
        tokio::time::sleep(self.config.log_settle_delay).await;
        let output = self
            .tool(vec!["logs".to_string(), identity.to_string()])
            .await?;
        if !output.success() {
            return Err(HarnessError::CommandFailed {
                command: format!("{} logs {}", self.config.tool.program(), identity),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(LogCapture::new(output.stdout, output.stderr))
    }

    /// Stops and removes the container. Failures are logged, never returned.
    pub async fn teardown(&self, handle: ContainerHandle) {
        log::info!("Tearing down container {}", handle.identity());
        self.remove(handle.identity()).await;
    }

    async fn remove(&self, identity: &str) {
        for action in ["kill", "rm"] {
            match self.tool(vec![action.to_string(), identity.to_string()]).await {
                Ok(output) if output.success() => {}
                Ok(output) => log::warn!(
                    "'{} {}' exited with code {}: {}",
                    action,
                    identity,
                    output.exit_code,
                    output.stderr.trim()
                ),
                Err(e) => log::warn!("'{} {}' failed: {}", action, identity, e),
            }
        }
    }

    /// Provisions a container, runs `body` against it and tears the container
    /// down afterwards, whether `body` succeeds, fails or panics.
    pub async fn with_container<F, Fut, T>(
        &self,
        image: &str,
        env: &EnvironmentSet,
        body: F,
    ) -> Result<T, HarnessError>
    where
        F: FnOnce(ContainerSession) -> Fut,
        Fut: Future<Output = Result<T, HarnessError>>,
    {
        let handle = self.provision(image, env).await?;
        let session = ContainerSession {
            manager: self.clone(),
            identity: handle.identity().to_string(),
            client: handle.client(self.config.http_timeout),
        };

        let outcome = AssertUnwindSafe(async move { body(session).await })
            .catch_unwind()
            .await;
        self.teardown(handle).await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// What a scenario body gets to work with while its container is alive.
pub struct ContainerSession {
    manager: ContainerManager,
    identity: String,
    client: ActionClient,
}

impl ContainerSession {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn client(&self) -> &ActionClient {
        &self.client
    }

    pub async fn logs(&self) -> Result<LogCapture, HarnessError> {
        self.manager.fetch_logs(&self.identity).await
    }
}
