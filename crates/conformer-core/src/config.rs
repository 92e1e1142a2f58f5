//! Harness configuration resolved once at startup
//!
//! The container tool path, the daemon address, and the networking strategy
//! are decided here, before any container exists, and then handed to every
//! component by reference. Detection reads through a lookup closure so the
//! policy can be exercised without touching the process environment.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use which::which;

use crate::errors::HarnessError;

pub const DEFAULT_CONTAINER_PORT: u16 = 8080;
pub const DEFAULT_HOST_PORT: u16 = 8988;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_LOG_SETTLE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

const DOCKER_BIN_CANDIDATES: [&str; 2] = ["/usr/bin/docker", "/usr/local/bin/docker"];

pub const ENV_DOCKER_BIN: &str = "CONFORMER_DOCKER_BIN";
pub const ENV_DOCKER_HOST: &str = "DOCKER_HOST";
pub const ENV_NETWORK_MODE: &str = "CONFORMER_NETWORK_MODE";
pub const ENV_PROXY_HOST: &str = "CONFORMER_PROXY_HOST";
pub const ENV_HOST_PORT: &str = "CONFORMER_HOST_PORT";
pub const ENV_CONTAINER_PORT: &str = "CONFORMER_CONTAINER_PORT";
pub const ENV_COMMAND_TIMEOUT: &str = "CONFORMER_COMMAND_TIMEOUT_SECS";
pub const ENV_SETTLE_DELAY: &str = "CONFORMER_SETTLE_DELAY_MS";
pub const ENV_LOG_SETTLE_DELAY: &str = "CONFORMER_LOG_SETTLE_DELAY_MS";
pub const ENV_HTTP_TIMEOUT: &str = "CONFORMER_HTTP_TIMEOUT_SECS";

/// The container tool invocation prefix: binary plus optional daemon address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    binary: PathBuf,
    host: Option<String>,
}

impl ToolCommand {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn program(&self) -> String {
        self.binary.to_string_lossy().into_owned()
    }

    /// Full argument list for a tool subcommand, with the daemon address first.
    pub fn args<I, S>(&self, subcommand: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = Vec::new();
        if let Some(host) = &self.host {
            args.push("--host".to_string());
            args.push(host.clone());
        }
        args.extend(subcommand.into_iter().map(Into::into));
        args
    }

    fn locate_binary(explicit: Option<String>) -> Result<PathBuf, HarnessError> {
        if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(path));
        }
        DOCKER_BIN_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
            .or_else(|| which("docker").ok())
            .ok_or_else(|| {
                HarnessError::Config(format!(
                    "Unable to locate the docker binary. Install docker or set {}.",
                    ENV_DOCKER_BIN
                ))
            })
    }
}

/// How the harness reaches a freshly launched container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    /// Talk to the container's own address on the bridge network.
    DirectIp,
    /// Publish the container port on `host_port` and talk to `host`.
    PublishedPort { host: String, host_port: u16 },
}

impl NetworkMode {
    pub fn published(host_port: u16) -> Self {
        NetworkMode::PublishedPort {
            host: "localhost".to_string(),
            host_port,
        }
    }

    /// Picks the strategy for this host.
    ///
    /// An explicit `CONFORMER_NETWORK_MODE` wins. A configured proxy host
    /// forces published ports. Otherwise macOS without `DOCKER_HOST` cannot
    /// route to container addresses and gets published ports; everything else
    /// uses the container address directly.
    pub fn detect<F>(os: &str, lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host_port = parse_number(&lookup, ENV_HOST_PORT, DEFAULT_HOST_PORT)?;
        let proxy_host = lookup(ENV_PROXY_HOST).filter(|h| !h.trim().is_empty());
        let published = |host: Option<String>| NetworkMode::PublishedPort {
            host: host.unwrap_or_else(|| "localhost".to_string()),
            host_port,
        };

        if let Some(mode) = lookup(ENV_NETWORK_MODE).filter(|m| !m.trim().is_empty()) {
            return match mode.trim().to_lowercase().as_str() {
                "direct" | "direct-ip" => Ok(NetworkMode::DirectIp),
                "published" | "published-port" => Ok(published(proxy_host)),
                other => Err(HarnessError::Config(format!(
                    "Unknown {} value '{}', expected 'direct' or 'published'",
                    ENV_NETWORK_MODE, other
                ))),
            };
        }

        if proxy_host.is_some() {
            return Ok(published(proxy_host));
        }

        let docker_host_set = lookup(ENV_DOCKER_HOST).is_some_and(|h| !h.is_empty());
        if os.to_lowercase().contains("mac") && !docker_host_set {
            Ok(published(None))
        } else {
            Ok(NetworkMode::DirectIp)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub tool: ToolCommand,
    pub network: NetworkMode,
    pub container_port: u16,
    pub command_timeout: Duration,
    pub settle_delay: Duration,
    pub log_settle_delay: Duration,
    pub http_timeout: Duration,
}

impl HarnessConfig {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            network: NetworkMode::DirectIp,
            container_port: DEFAULT_CONTAINER_PORT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            log_settle_delay: DEFAULT_LOG_SETTLE_DELAY,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(env::consts::OS, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(os: &str, lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tool = ToolCommand::new(ToolCommand::locate_binary(lookup(ENV_DOCKER_BIN))?);
        if let Some(host) = lookup(ENV_DOCKER_HOST).filter(|h| !h.is_empty()) {
            tool = tool.with_host(host);
        }

        let config = Self::new(tool)
            .with_network(NetworkMode::detect(os, &lookup)?)
            .with_container_port(parse_number(&lookup, ENV_CONTAINER_PORT, DEFAULT_CONTAINER_PORT)?)
            .with_command_timeout(Duration::from_secs(parse_number(
                &lookup,
                ENV_COMMAND_TIMEOUT,
                DEFAULT_COMMAND_TIMEOUT.as_secs(),
            )?))
            .with_settle_delay(Duration::from_millis(parse_number(
                &lookup,
                ENV_SETTLE_DELAY,
                DEFAULT_SETTLE_DELAY.as_millis() as u64,
            )?))
            .with_log_settle_delay(Duration::from_millis(parse_number(
                &lookup,
                ENV_LOG_SETTLE_DELAY,
                DEFAULT_LOG_SETTLE_DELAY.as_millis() as u64,
            )?))
            .with_http_timeout(Duration::from_secs(parse_number(
                &lookup,
                ENV_HTTP_TIMEOUT,
                DEFAULT_HTTP_TIMEOUT.as_secs(),
            )?));

        log::debug!("Resolved harness configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_network(mut self, network: NetworkMode) -> Self {
        self.network = network;
        self
    }

    pub fn with_container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_log_settle_delay(mut self, delay: Duration) -> Self {
        self.log_settle_delay = delay;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, HarnessError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            HarnessError::Config(format!("{} must be a non-negative number, got '{}'", key, raw))
        }),
        _ => Ok(default),
    }
}
