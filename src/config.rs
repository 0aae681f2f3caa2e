//! Configuration management for vault-cli.
//!
//! The configuration file is TOML with three sections:
//!
//! ```toml
//! [vault]
//! scheme = "service/dc1/vault/config/scheme"  # or "default" for plain http
//! name = "vault"
//!
//! [init]
//! save = true
//! shares = 5
//! threshold = 3
//!
//! [consul]
//! addr = "default"
//! scheme = "default"
//! ```
//!
//! The file is read once at startup into an immutable [`ClusterConfig`] which
//! is then passed explicitly to every component.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "vault-cli.toml";

/// File the rendered key shares are persisted to when `init.save` is set.
pub const KEYS_FILE: &str = "vault-keys";

/// Environment variable carrying the Consul ACL token.
pub const CONSUL_TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";

const DEFAULT_MARKER: &str = "default";
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_CONSUL_ADDR: &str = "127.0.0.1:8500";
const DEFAULT_SERVICE_NAME: &str = "vault";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("init.{field} must be an integer between 1 and 255, got '{value}'")]
    InvalidCount { field: &'static str, value: String },
    #[error("init.threshold ({threshold}) must not exceed init.shares ({shares})")]
    ThresholdExceedsShares { threshold: u8, shares: u8 },
}

/// Where the store's URL scheme comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeSource {
    /// Use this scheme as is.
    Fixed(String),
    /// Resolve the scheme from this Consul KV path.
    Registry(String),
}

/// Immutable per-run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Consul `host:port`.
    pub registry_address: String,
    pub registry_scheme: String,
    /// Catalog service name the Vault nodes register under.
    pub store_service_name: String,
    pub store_scheme: SchemeSource,
    pub share_count: u8,
    pub unseal_threshold: u8,
    pub persist_keys: bool,
    /// Destination of persisted key material. Always [`KEYS_FILE`] when loaded
    /// from a file.
    pub keys_path: PathBuf,
}

impl ClusterConfig {
    /// Loads and validates the config file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;

        let share_count = parse_count("shares", &file.init.shares)?;
        let unseal_threshold = parse_count("threshold", &file.init.threshold)?;
        if unseal_threshold > share_count {
            return Err(ConfigError::ThresholdExceedsShares {
                threshold: unseal_threshold,
                shares: share_count,
            });
        }

        let store_scheme = match or_default(file.vault.scheme) {
            None => SchemeSource::Fixed(DEFAULT_SCHEME.to_owned()),
            Some(path) => SchemeSource::Registry(path),
        };

        Ok(Self {
            registry_address: or_default(file.consul.addr)
                .unwrap_or_else(|| DEFAULT_CONSUL_ADDR.to_owned()),
            registry_scheme: or_default(file.consul.scheme)
                .unwrap_or_else(|| DEFAULT_SCHEME.to_owned()),
            store_service_name: file
                .vault
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_owned()),
            store_scheme,
            share_count,
            unseal_threshold,
            persist_keys: file.init.save,
            keys_path: PathBuf::from(KEYS_FILE),
        })
    }
}

/// Maps absent, empty and `"default"` values to `None`.
fn or_default(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != DEFAULT_MARKER)
}

fn parse_count(field: &'static str, value: &Count) -> Result<u8, ConfigError> {
    let invalid = || ConfigError::InvalidCount {
        field,
        value: value.to_string(),
    };
    let n = match value {
        Count::Int(n) => *n,
        Count::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
    };
    // Vault rejects share counts above u8::MAX.
    match u8::try_from(n) {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    vault: VaultSection,
    init: InitSection,
    #[serde(default)]
    consul: ConsulSection,
}

#[derive(Debug, Default, Deserialize)]
struct VaultSection {
    scheme: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitSection {
    #[serde(default)]
    save: bool,
    shares: Count,
    threshold: Count,
}

#[derive(Debug, Default, Deserialize)]
struct ConsulSection {
    addr: Option<String>,
    scheme: Option<String>,
}

/// Share counts are written either as integers or as quoted strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Int(n) => write!(f, "{}", n),
            Count::Text(s) => f.write_str(s),
        }
    }
}
