//! Bootstrap and unseal a Vault cluster whose nodes are discovered in Consul.
//!
//! The library is the whole tool; `main.rs` only wires stdin, stdout and the
//! environment into [`cli::run`].

pub mod cli;
pub mod config;
pub mod net;
pub mod output;
pub mod protocol;
pub mod secret;
pub mod storage;
