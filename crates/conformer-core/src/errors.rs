//! Error types for the conformance harness
//!
//! Failures are grouped by where they originate: the container tool could not
//! be started, the container could not be provisioned or reached, an HTTP call
//! never arrived, or the captured logs did not satisfy the scenario. A non-2xx
//! answer from the action container is not an error: it is data
//! carried by [`crate::protocol::RunResult`] and judged by the scenario layer.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Container '{identity}' could not be provisioned (exit code {exit_code}): {stderr}")]
    Provision {
        identity: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("Could not resolve a reachable address for container '{identity}': {reason}")]
    NetworkResolution { identity: String, reason: String },
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Log verification failed: {0}")]
    Verification(#[from] VerificationFailure),
    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("Command '{command}' exited with code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    /// Whether the error means the container tool itself is unusable, in which
    /// case running further scenarios is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarnessError::Spawn { .. })
    }
}

/// Which captured stream a verification failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("expected {expected} {stream} sentinel(s), found {actual}")]
    SentinelCount {
        stream: Stream,
        expected: usize,
        actual: usize,
    },
    #[error("{0}")]
    Content(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
