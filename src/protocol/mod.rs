//! Protocol Layer.
//!
//! Drives a Vault cluster from discovery to unsealed:
//! - Topology discovery through the registry (`topology`)
//! - One-time initialization and the bootstrap flow (`bootstrap`)
//! - Threshold unseal rounds, per node and cluster-wide (`unseal`)
//!
//! Registry and health failures are soft: they are reported to the operator
//! and the affected node or step is skipped. Only the errors below abort a run.

pub mod bootstrap;
pub mod topology;
pub mod unseal;

#[cfg(test)]
pub(crate) mod testing;

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::StoreError;

/// Errors that abort a bootstrap or unseal run.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Registry token variable unset or empty.
    #[error("Variable '{0}' is not set.")]
    MissingToken(&'static str),
    /// Interactive key count differs from the configured threshold.
    #[error("The number of unseal keys should be equal {expected}, got {got}. Try again.")]
    ShareCount { expected: u8, got: usize },
    #[error("failed to read unseal keys: {0}")]
    Input(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The init gate could not learn whether the cluster is initialized.
    #[error("health check of {node} failed: {source}")]
    Health {
        node: String,
        #[source]
        source: StoreError,
    },
    #[error("initialization through {node} failed: {source}")]
    Init {
        node: String,
        #[source]
        source: StoreError,
    },
    /// Init returned fewer shares than the unseal threshold.
    #[error("init returned {got} key shares, threshold is {expected}")]
    ShortInit { expected: u8, got: usize },
    #[error("failed to write operator output: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// One Vault node as registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Registry-assigned identity, unique within one discovery.
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl Node {
    /// Base URL of the node. IPv6 literals are bracketed.
    pub fn url(&self, scheme: &str) -> String {
        match self.address.parse::<IpAddr>() {
            Ok(ip) => format!("{}://{}", scheme, SocketAddr::new(ip, self.port)),
            Err(_) => format!("{}://{}:{}", scheme, self.address, self.port),
        }
    }
}
