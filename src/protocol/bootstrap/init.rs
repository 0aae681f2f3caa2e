//! Health-gated cluster initialization.
//!
//! Vault emits key shares and the root token only from the first init call.
//! A second call against an initialized node is refused, so init is only ever
//! issued right after a probe reporting `initialized == false`.

use std::io::Write;

use crate::net::{InitResult, SecretStore};
use crate::protocol::{Node, ProtocolError};

/// Result of the init gate.
#[derive(Debug)]
pub enum InitOutcome {
    /// The cluster was initialized by someone else before this run.
    AlreadyInitialized,
    /// This run initialized the cluster.
    Initialized(InitResult),
}

/// Probes `node` and initializes the cluster through it if needed.
///
/// A failed probe or a failed init call is fatal: nothing was initialized,
/// so rerunning once the node is reachable is safe.
pub async fn initialize_if_needed<S, W>(
    store: &S,
    node: &Node,
    url: &str,
    shares: u8,
    threshold: u8,
    out: &mut W,
) -> Result<InitOutcome, ProtocolError>
where
    S: SecretStore,
    W: Write,
{
    let health = store
        .health(url)
        .await
        .map_err(|source| ProtocolError::Health {
            node: node.name.clone(),
            source,
        })?;

    if health.initialized {
        writeln!(out, "* Vault is already initialized")?;
        return Ok(InitOutcome::AlreadyInitialized);
    }

    log::info!(
        "initializing through {} with {} shares, threshold {}",
        url,
        shares,
        threshold
    );
    let init = store
        .init(url, shares, threshold)
        .await
        .map_err(|source| ProtocolError::Init {
            node: node.name.clone(),
            source,
        })?;
    Ok(InitOutcome::Initialized(init))
}
