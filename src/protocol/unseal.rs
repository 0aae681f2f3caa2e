//! Threshold unseal rounds.
//!
//! A round against one node is: probe, submit every share of the batch
//! concurrently, wait for all submissions, probe again. A node that already
//! reports unsealed gets no submissions at all.

use std::io::{BufRead, Write};

use futures::future::join_all;
use zeroize::Zeroizing;

use super::topology::{discover, Topology};
use super::{Node, ProtocolError};
use crate::config::ClusterConfig;
use crate::net::{SecretStore, ServiceRegistry};
use crate::secret::SecretString;

/// Where a node ended up after one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsealOutcome {
    /// Reported unsealed before any share was sent.
    AlreadyUnsealed,
    /// Sealed before the round, unsealed after it.
    Unsealed,
    /// Still sealed after the round: wrong shares or too few distinct ones.
    StillSealed,
    /// Seal state could not be read; the round was abandoned or its result
    /// is unknown.
    ProbeFailed(String),
}

/// Record of one round against one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealAttempt {
    pub node: Node,
    /// Shares sent in this round.
    pub submitted: usize,
    /// Submissions that failed in transport or were refused by the node.
    pub failed_submissions: usize,
    pub outcome: UnsealOutcome,
}

impl UnsealAttempt {
    fn skipped(node: &Node, outcome: UnsealOutcome) -> Self {
        Self {
            node: node.clone(),
            submitted: 0,
            failed_submissions: 0,
            outcome,
        }
    }
}

/// Runs one unseal round against `node`, reachable at `url`.
pub async fn unseal_node<S, W>(
    store: &S,
    node: &Node,
    url: &str,
    shares: &[SecretString],
    out: &mut W,
) -> Result<UnsealAttempt, ProtocolError>
where
    S: SecretStore,
    W: Write,
{
    writeln!(out, "* Unseal node {}: {}\n", node.name, url)?;

    match store.health(url).await {
        Ok(status) if !status.sealed => {
            writeln!(out, "* Node {} already unsealed\n", node.name)?;
            return Ok(UnsealAttempt::skipped(node, UnsealOutcome::AlreadyUnsealed));
        }
        Ok(_) => {}
        Err(e) => {
            log::warn!("skipping {}: {}", node.name, e);
            writeln!(out, "* Health check failed, skipping node: {}\n", e)?;
            return Ok(UnsealAttempt::skipped(
                node,
                UnsealOutcome::ProbeFailed(e.to_string()),
            ));
        }
    }

    for (i, share) in shares.iter().enumerate() {
        writeln!(out, "Use key {}: {}", i + 1, share.expose())?;
    }

    // All submissions are in flight before any is awaited; the second probe
    // only runs once every one of them has resolved.
    let results = join_all(shares.iter().map(|share| store.unseal(url, share))).await;

    let mut failed_submissions = 0;
    for (i, result) in results.iter().enumerate() {
        if let Err(e) = result {
            failed_submissions += 1;
            log::warn!("key {} not applied on {}: {}", i + 1, node.name, e);
            writeln!(out, "* Key {} was not applied: {}", i + 1, e)?;
        }
    }

    let outcome = match store.health(url).await {
        Ok(status) if !status.sealed => {
            writeln!(out, "\n* Node successfully unsealed\n")?;
            UnsealOutcome::Unsealed
        }
        Ok(_) => {
            writeln!(out, "\n* Node did not unseal\n")?;
            UnsealOutcome::StillSealed
        }
        Err(e) => {
            log::warn!("cannot confirm seal state of {}: {}", node.name, e);
            writeln!(out, "\n* Could not confirm seal state: {}\n", e)?;
            UnsealOutcome::ProbeFailed(e.to_string())
        }
    };
    log::info!("{}: {:?}", node.name, outcome);

    Ok(UnsealAttempt {
        node: node.clone(),
        submitted: shares.len(),
        failed_submissions,
        outcome,
    })
}

/// Runs one round per node, one node at a time, in topology order.
pub async fn unseal_topology<S, W>(
    store: &S,
    topology: &Topology,
    shares: &[SecretString],
    out: &mut W,
) -> Result<Vec<UnsealAttempt>, ProtocolError>
where
    S: SecretStore,
    W: Write,
{
    let mut attempts = Vec::with_capacity(topology.nodes.len());
    for node in topology.iter() {
        let url = topology.url(node);
        attempts.push(unseal_node(store, node, &url, shares, out).await?);
    }
    Ok(attempts)
}

/// Splits one line of operator input into shares and checks the count.
pub fn read_shares(line: &str, threshold: u8) -> Result<Vec<SecretString>, ProtocolError> {
    let shares: Vec<SecretString> = line.split_whitespace().map(SecretString::from).collect();
    if shares.len() != usize::from(threshold) {
        return Err(ProtocolError::ShareCount {
            expected: threshold,
            got: shares.len(),
        });
    }
    Ok(shares)
}

/// Interactive unseal of the whole cluster.
///
/// Reads one line of whitespace-separated shares from `input`. A wrong share
/// count aborts before the registry or any node is contacted.
pub async fn unseal_cluster<R, S, I, W>(
    registry: &R,
    store: &S,
    config: &ClusterConfig,
    input: &mut I,
    out: &mut W,
) -> Result<Vec<UnsealAttempt>, ProtocolError>
where
    R: ServiceRegistry,
    S: SecretStore,
    I: BufRead,
    W: Write,
{
    let mut line = Zeroizing::new(String::new());
    input.read_line(&mut line).map_err(ProtocolError::Input)?;
    let shares = read_shares(&line, config.unseal_threshold)?;

    let topology = discover(registry, config, out).await?;
    unseal_topology(store, &topology, &shares, out).await
}
