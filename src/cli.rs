//! Command-line surface.
//!
//! `vault-cli bootstrap` (`b`) and `vault-cli unseal` (`u`). Both need the
//! Consul token in the environment; without it nothing is read or sent.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::config::{ClusterConfig, CONSUL_TOKEN_ENV, DEFAULT_CONFIG_FILE};
use crate::net::{ConsulClient, VaultClient};
use crate::protocol::bootstrap::bootstrap_cluster;
use crate::protocol::unseal::{unseal_cluster, UnsealOutcome};
use crate::protocol::ProtocolError;
use crate::secret::SecretString;

#[derive(Debug, Parser)]
#[command(
    name = "vault-cli",
    version,
    arg_required_else_help = true,
    about = "Bootstrap and unseal a Vault cluster discovered through Consul"
)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Bootstrap Vault cluster
    #[command(alias = "b")]
    Bootstrap,
    /// Unseal Vault cluster with keys read from stdin
    #[command(alias = "u")]
    Unseal,
}

/// Rejects an unset or empty registry token.
pub fn registry_token(value: Option<String>) -> Result<SecretString, ProtocolError> {
    match value {
        Some(token) if !token.is_empty() => Ok(SecretString::from(token)),
        _ => Err(ProtocolError::MissingToken(CONSUL_TOKEN_ENV)),
    }
}

/// Runs `cli.command` to completion.
///
/// `token` is the raw value of [`CONSUL_TOKEN_ENV`]. Unseal keys are read
/// from `input`; everything meant for the operator goes to `out`.
pub fn run<I, W>(
    cli: &Cli,
    token: Option<String>,
    input: &mut I,
    out: &mut W,
) -> Result<(), ProtocolError>
where
    I: BufRead,
    W: Write,
{
    let token = registry_token(token)?;
    let config = ClusterConfig::load(&cli.config)?;
    log::debug!("{:?}", config);

    let registry = ConsulClient::new(
        &config.registry_scheme,
        &config.registry_address,
        Some(token),
    );
    let store = VaultClient::new();
    let runtime = Runtime::new().map_err(ProtocolError::Runtime)?;

    runtime.block_on(async {
        match cli.command {
            Command::Bootstrap => {
                let report = bootstrap_cluster(&registry, &store, &config, out).await?;
                log::info!(
                    "bootstrap finished: initialized={} persisted={} nodes={}",
                    report.initialized,
                    report.keys_persisted,
                    report.attempts.len()
                );
            }
            Command::Unseal => {
                let attempts = unseal_cluster(&registry, &store, &config, input, out).await?;
                let unsealed = attempts
                    .iter()
                    .filter(|a| {
                        matches!(
                            a.outcome,
                            UnsealOutcome::Unsealed | UnsealOutcome::AlreadyUnsealed
                        )
                    })
                    .count();
                log::info!("unseal finished: {}/{} nodes unsealed", unsealed, attempts.len());
            }
        }
        out.flush()?;
        Ok::<(), ProtocolError>(())
    })
}
