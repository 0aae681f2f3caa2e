//! Consul registry access.
//!
//! Two read-only queries are needed: the catalog entries of the Vault service
//! and a single KV value holding the scheme Vault listens on.

pub mod client;

pub use client::ConsulClient;

use thiserror::Error;

use crate::net::http::BodyError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("registry returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("malformed registry response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("registry address '{url}' is not a valid base URL")]
    InvalidUrl { url: String },
    #[error("value at KV path '{path}' is not base64-encoded UTF-8")]
    Encoding { path: String },
}

impl RegistryError {
    pub(crate) fn from_body(url: &str, err: BodyError) -> Self {
        let url = url.to_owned();
        match err {
            BodyError::Transport(source) => Self::Transport { url, source },
            BodyError::Decode(source) => Self::Decode { url, source },
        }
    }
}

/// One registration of a service in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Catalog node the service instance is registered on.
    pub node: String,
    /// Registration ID, unique per node.
    pub service_id: String,
    pub address: String,
    pub port: u16,
}

impl ServiceRecord {
    /// Identifier that is unique across the whole catalog answer.
    pub fn key(&self) -> String {
        format!("{}/{}", self.node, self.service_id)
    }
}

/// Read access to the service registry.
#[allow(async_fn_in_trait)]
pub trait ServiceRegistry {
    /// Lists every registration of `service`, in registry order.
    async fn service_nodes(&self, service: &str) -> Result<Vec<ServiceRecord>, RegistryError>;

    /// Fetches and decodes the value at `path`. `None` if the key is absent.
    async fn kv_value(&self, path: &str) -> Result<Option<String>, RegistryError>;
}
