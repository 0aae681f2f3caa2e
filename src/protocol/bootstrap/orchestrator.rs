//! Bootstrap Orchestrator.
//!
//! Manages the execution flow of the bootstrap process. Ordering is strict:
//! the key material is written out before the first share is submitted, since
//! it cannot be recovered from Vault afterwards.

use std::io::Write;

use zeroize::Zeroizing;

use super::init::{initialize_if_needed, InitOutcome};
use crate::config::ClusterConfig;
use crate::net::{SecretStore, ServiceRegistry};
use crate::output::render;
use crate::protocol::topology::discover;
use crate::protocol::unseal::{unseal_topology, UnsealAttempt};
use crate::protocol::ProtocolError;
use crate::storage::write_restricted;

/// What a bootstrap run did.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    /// True if this run performed the init call.
    pub initialized: bool,
    /// Whether the rendered keys reached `keys_path`. Only meaningful when
    /// persistence is configured.
    pub keys_persisted: bool,
    /// One entry per discovered node, in topology order.
    pub attempts: Vec<UnsealAttempt>,
}

/// Discovers the cluster, initializes it if needed and unseals every node.
///
/// An already initialized cluster is left alone: its shares are not known to
/// this run, so no unseal rounds follow.
pub async fn bootstrap_cluster<R, S, W>(
    registry: &R,
    store: &S,
    config: &ClusterConfig,
    out: &mut W,
) -> Result<BootstrapReport, ProtocolError>
where
    R: ServiceRegistry,
    S: SecretStore,
    W: Write,
{
    let topology = discover(registry, config, out).await?;
    let Some(first) = topology.first() else {
        return Ok(BootstrapReport::default());
    };
    let first_url = topology.url(first);

    let init = match initialize_if_needed(
        store,
        first,
        &first_url,
        config.share_count,
        config.unseal_threshold,
        out,
    )
    .await?
    {
        InitOutcome::AlreadyInitialized => return Ok(BootstrapReport::default()),
        InitOutcome::Initialized(init) => init,
    };

    let rendered = Zeroizing::new(render(&init));
    out.write_all(rendered.as_bytes())?;
    out.flush()?;

    let mut keys_persisted = false;
    if config.persist_keys {
        match write_restricted(&config.keys_path, rendered.as_bytes()) {
            Ok(()) => keys_persisted = true,
            Err(e) => {
                log::error!("key material not saved: {}", e);
                writeln!(out, "* Failed to save keys: {}\n", e)?;
            }
        }
    }

    let threshold = usize::from(config.unseal_threshold);
    if init.keys_base64.len() < threshold {
        return Err(ProtocolError::ShortInit {
            expected: config.unseal_threshold,
            got: init.keys_base64.len(),
        });
    }
    let batch = &init.keys_base64[..threshold];

    let attempts = unseal_topology(store, &topology, batch, out).await?;
    Ok(BootstrapReport {
        initialized: true,
        keys_persisted,
        attempts,
    })
}
