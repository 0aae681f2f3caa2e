//! Bootstrap Protocol.
//!
//! Takes a freshly deployed cluster to unsealed:
//! - Discovery of the Vault nodes through the registry.
//! - One-time initialization through the first node, gated on its health.
//! - Hand-off of the key material to the operator (and optionally to disk).
//! - A first unseal round on every node with a threshold-sized prefix of the
//!   new shares.

pub mod init;
pub mod orchestrator;

pub use init::{initialize_if_needed, InitOutcome};
pub use orchestrator::{bootstrap_cluster, BootstrapReport};
