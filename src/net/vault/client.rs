use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::health::{carries_health_body, HealthResponse};
use super::{HealthStatus, InitResult, SecretStore, StoreError};
use crate::net::http::{build_client, read_json};
use crate::secret::SecretString;

#[derive(Serialize)]
struct InitRequest {
    secret_shares: u8,
    secret_threshold: u8,
}

#[derive(Deserialize)]
struct InitResponse {
    keys: Vec<String>,
    keys_base64: Vec<String>,
    root_token: String,
}

impl From<InitResponse> for InitResult {
    fn from(resp: InitResponse) -> Self {
        InitResult {
            keys: resp.keys.into_iter().map(SecretString::from).collect(),
            keys_base64: resp.keys_base64.into_iter().map(SecretString::from).collect(),
            root_token: SecretString::from(resp.root_token),
        }
    }
}

#[derive(Serialize)]
struct UnsealRequest<'a> {
    key: &'a SecretString,
}

/// Vault HTTP API client. Health checks are unauthenticated; init and unseal
/// need no token either.
pub struct VaultClient {
    client: Client,
}

impl VaultClient {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }

    async fn post<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response, StoreError> {
        log::debug!("POST {}", url);
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                url: url.to_owned(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(StoreError::Status {
                url: url.to_owned(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }
}

impl Default for VaultClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for VaultClient {
    async fn health(&self, node_url: &str) -> Result<HealthStatus, StoreError> {
        let url = format!("{}/v1/sys/health", node_url);
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = resp.status().as_u16();
        if !carries_health_body(status) {
            return Err(StoreError::Status { url, status });
        }
        let body: HealthResponse = read_json(resp)
            .await
            .map_err(|e| StoreError::from_body(&url, e))?;
        log::debug!(
            "{}: version={:?} cluster={:?} ({:?}) standby={}",
            node_url,
            body.version,
            body.cluster_name,
            body.cluster_id,
            body.standby
        );
        Ok(body.into())
    }

    async fn init(
        &self,
        node_url: &str,
        shares: u8,
        threshold: u8,
    ) -> Result<InitResult, StoreError> {
        let url = format!("{}/v1/sys/init", node_url);
        let body = InitRequest {
            secret_shares: shares,
            secret_threshold: threshold,
        };
        let resp = self.post(&url, &body).await?;
        let init: InitResponse = read_json(resp)
            .await
            .map_err(|e| StoreError::from_body(&url, e))?;
        Ok(init.into())
    }

    async fn unseal(&self, node_url: &str, key: &SecretString) -> Result<(), StoreError> {
        let url = format!("{}/v1/sys/unseal", node_url);
        self.post(&url, &UnsealRequest { key }).await?;
        Ok(())
    }
}
