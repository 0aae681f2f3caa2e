//! Vault `sys/` endpoints used to bootstrap a cluster.
//!
//! Every call takes the node's base URL (`scheme://host:port`) so one client
//! can serve the whole topology.

pub mod client;
pub mod health;

pub use client::VaultClient;
pub use health::HealthStatus;

use thiserror::Error;

use crate::net::http::BodyError;
use crate::secret::SecretString;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn from_body(url: &str, err: BodyError) -> Self {
        let url = url.to_owned();
        match err {
            BodyError::Transport(source) => Self::Transport { url, source },
            BodyError::Decode(source) => Self::Decode { url, source },
        }
    }
}

/// Key material returned by the one-time init call.
///
/// Vault emits this exactly once; it must reach the operator before anything
/// else is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitResult {
    /// Hex-encoded shares, in the order Vault returned them.
    pub keys: Vec<SecretString>,
    /// The same shares base64-encoded, same order.
    pub keys_base64: Vec<SecretString>,
    pub root_token: SecretString,
}

/// The Vault operations the orchestrator drives.
#[allow(async_fn_in_trait)]
pub trait SecretStore {
    /// Reads `sys/health`. Never cached by callers.
    async fn health(&self, node_url: &str) -> Result<HealthStatus, StoreError>;

    /// Initializes the cluster through `node_url`. Not idempotent.
    async fn init(&self, node_url: &str, shares: u8, threshold: u8)
        -> Result<InitResult, StoreError>;

    /// Submits a single unseal key share.
    async fn unseal(&self, node_url: &str, key: &SecretString) -> Result<(), StoreError>;
}
