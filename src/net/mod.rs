//! HTTP collaborators: the Consul registry and the Vault nodes.

pub mod consul;
pub mod http;
pub mod vault;

pub use consul::{ConsulClient, RegistryError, ServiceRecord, ServiceRegistry};
pub use vault::{HealthStatus, InitResult, SecretStore, StoreError, VaultClient};
