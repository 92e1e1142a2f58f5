//! Ephemeral action containers: naming, provisioning, log capture and teardown.

use std::time::Duration;
use uuid::Uuid;

use crate::protocol::ActionClient;

pub mod manager;

pub use manager::{ContainerManager, ContainerSession};

/// A launched container whose address has been resolved.
///
/// Not `Clone`: [`ContainerManager::teardown`] takes the handle
/// by value, so a container cannot be torn down twice or used afterwards.
#[derive(Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    identity: String,
    host: String,
    port: u16,
}

impl ContainerHandle {
    pub(crate) fn new(identity: String, host: String, port: u16) -> Self {
        Self {
            identity,
            host,
            port,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client(&self, timeout: Duration) -> ActionClient {
        ActionClient::new(&self.host, self.port).with_timeout(timeout)
    }
}

/// Unique container name for an image: the image name reduced to lowercase
/// letters, followed by a random suffix.
pub fn container_identity(image: &str) -> String {
    let prefix: String = image
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

/// Keeps only the characters of a dotted IPv4 address.
pub fn clean_ip_address(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}
