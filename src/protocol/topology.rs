//! Cluster discovery.
//!
//! Resolves the scheme Vault listens on and the set of Vault nodes. Registry
//! failures never abort: an unresolvable scheme falls back to `http` and an
//! unresolvable catalog yields an empty topology, so no unseal rounds run.

use std::io::Write;

use indexmap::IndexMap;

use super::{Node, ProtocolError};
use crate::config::{ClusterConfig, SchemeSource};
use crate::net::ServiceRegistry;

const FALLBACK_SCHEME: &str = "http";

/// Nodes in registry order, keyed by registration identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub scheme: String,
    pub nodes: IndexMap<String, Node>,
}

impl Topology {
    pub fn url(&self, node: &Node) -> String {
        node.url(&self.scheme)
    }

    pub fn first(&self) -> Option<&Node> {
        self.nodes.values().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Resolves scheme and nodes. Only an output write failure is an error.
pub async fn discover<R, W>(
    registry: &R,
    config: &ClusterConfig,
    out: &mut W,
) -> Result<Topology, ProtocolError>
where
    R: ServiceRegistry,
    W: Write,
{
    let scheme = resolve_scheme(registry, &config.store_scheme, out).await?;

    let records = match registry.service_nodes(&config.store_service_name).await {
        Ok(records) => records,
        Err(e) => {
            log::warn!("catalog lookup failed: {}", e);
            writeln!(out, "* {}", e)?;
            Vec::new()
        }
    };

    let mut nodes = IndexMap::with_capacity(records.len());
    for record in records {
        let name = record.key();
        let node = Node {
            name: name.clone(),
            address: record.address,
            port: record.port,
        };
        if nodes.insert(name.clone(), node).is_some() {
            log::warn!("registration {} listed twice, keeping the last entry", name);
        }
    }

    if nodes.is_empty() {
        writeln!(
            out,
            "* No nodes found for service '{}'",
            config.store_service_name
        )?;
    } else {
        log::info!(
            "discovered {} node(s) of '{}' over {}",
            nodes.len(),
            config.store_service_name,
            scheme
        );
    }

    Ok(Topology { scheme, nodes })
}

async fn resolve_scheme<R, W>(
    registry: &R,
    source: &SchemeSource,
    out: &mut W,
) -> Result<String, ProtocolError>
where
    R: ServiceRegistry,
    W: Write,
{
    let path = match source {
        SchemeSource::Fixed(scheme) => return Ok(scheme.clone()),
        SchemeSource::Registry(path) => path,
    };

    match registry.kv_value(path).await {
        Ok(Some(value)) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        Ok(_) => {
            log::warn!("KV path '{}' is empty or absent", path);
            writeln!(
                out,
                "* No scheme stored at '{}', using {}",
                path, FALLBACK_SCHEME
            )?;
            Ok(FALLBACK_SCHEME.to_owned())
        }
        Err(e) => {
            log::warn!("scheme lookup failed: {}", e);
            writeln!(out, "* {}, using {}", e, FALLBACK_SCHEME)?;
            Ok(FALLBACK_SCHEME.to_owned())
        }
    }
}
