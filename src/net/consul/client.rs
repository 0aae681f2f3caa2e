use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{RegistryError, ServiceRecord, ServiceRegistry};
use crate::net::http::{build_client, read_json};
use crate::secret::SecretString;

/// ACL token header understood by the Consul HTTP API.
pub const TOKEN_HEADER: &str = "X-Consul-Token";

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "Node", default)]
    node: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "ServiceID", default)]
    service_id: String,
    #[serde(rename = "ServiceAddress", default)]
    service_address: String,
    #[serde(rename = "ServicePort", default)]
    service_port: u16,
}

impl From<CatalogEntry> for ServiceRecord {
    fn from(entry: CatalogEntry) -> Self {
        // An empty ServiceAddress means the service listens on the node address.
        let address = if entry.service_address.is_empty() {
            entry.address
        } else {
            entry.service_address
        };
        ServiceRecord {
            node: entry.node,
            service_id: entry.service_id,
            address,
            port: entry.service_port,
        }
    }
}

#[derive(Deserialize)]
struct KvEntry {
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// Consul HTTP API client.
pub struct ConsulClient {
    base_url: String,
    token: Option<SecretString>,
    client: Client,
}

impl ConsulClient {
    /// `address` is `host:port`. An empty token is treated as no token.
    pub fn new(scheme: &str, address: &str, token: Option<SecretString>) -> Self {
        Self {
            base_url: format!("{}://{}", scheme, address),
            token: token.filter(|t| !t.is_empty()),
            client: build_client(),
        }
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, RegistryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let invalid = || RegistryError::InvalidUrl {
            url: self.base_url.clone(),
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, RegistryError> {
        log::debug!("GET {}", url);
        let mut req = self.client.get(url.clone());
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token.expose());
        }
        req.send().await.map_err(|source| RegistryError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

impl ServiceRegistry for ConsulClient {
    async fn service_nodes(&self, service: &str) -> Result<Vec<ServiceRecord>, RegistryError> {
        let url = self.endpoint(["v1", "catalog", "service", service])?;
        let resp = self.get(&url).await?;
        let url = url.to_string();
        if !resp.status().is_success() {
            return Err(RegistryError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }
        let entries: Vec<CatalogEntry> = read_json(resp)
            .await
            .map_err(|e| RegistryError::from_body(&url, e))?;
        Ok(entries.into_iter().map(ServiceRecord::from).collect())
    }

    async fn kv_value(&self, path: &str) -> Result<Option<String>, RegistryError> {
        let url = self.endpoint(["v1", "kv"].into_iter().chain(path.split('/')))?;
        let resp = self.get(&url).await?;
        let url = url.to_string();
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }
        let entries: Vec<KvEntry> = read_json(resp)
            .await
            .map_err(|e| RegistryError::from_body(&url, e))?;

        let Some(encoded) = entries.into_iter().next().and_then(|e| e.value) else {
            return Ok(None);
        };
        let encoding = || RegistryError::Encoding {
            path: path.to_owned(),
        };
        let raw = STANDARD.decode(encoded.as_bytes()).map_err(|_| encoding())?;
        String::from_utf8(raw).map(Some).map_err(|_| encoding())
    }
}
