//! In-memory registry and Vault used by the protocol tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{ClusterConfig, SchemeSource};
use crate::net::{
    HealthStatus, InitResult, RegistryError, SecretStore, ServiceRecord, ServiceRegistry,
    StoreError,
};
use crate::secret::SecretString;

pub(crate) const SCHEME_PATH: &str = "service/dc1/vault/config/scheme";

pub(crate) fn config(shares: u8, threshold: u8) -> ClusterConfig {
    ClusterConfig {
        registry_address: "127.0.0.1:8500".into(),
        registry_scheme: "http".into(),
        store_service_name: "vault".into(),
        store_scheme: SchemeSource::Registry(SCHEME_PATH.into()),
        share_count: shares,
        unseal_threshold: threshold,
        persist_keys: false,
        keys_path: PathBuf::from("unused-vault-keys"),
    }
}

pub(crate) fn record(node: &str, address: &str, port: u16) -> ServiceRecord {
    ServiceRecord {
        node: node.into(),
        service_id: "vault".into(),
        address: address.into(),
        port,
    }
}

fn decode_error() -> serde_json::Error {
    serde_json::from_str::<serde_json::Value>("{").unwrap_err()
}

pub(crate) struct FakeRegistry {
    scheme: Option<String>,
    records: Vec<ServiceRecord>,
    unreachable: bool,
    catalog_calls: AtomicUsize,
    kv_calls: AtomicUsize,
}

impl FakeRegistry {
    pub(crate) fn new(scheme: Option<&str>, records: Vec<ServiceRecord>) -> Self {
        Self {
            scheme: scheme.map(str::to_owned),
            records,
            unreachable: false,
            catalog_calls: AtomicUsize::new(0),
            kv_calls: AtomicUsize::new(0),
        }
    }

    /// Every query fails to decode, as if something other than Consul answered.
    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(None, Vec::new())
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst) + self.kv_calls()
    }

    pub(crate) fn kv_calls(&self) -> usize {
        self.kv_calls.load(Ordering::SeqCst)
    }
}

impl ServiceRegistry for FakeRegistry {
    async fn service_nodes(&self, _service: &str) -> Result<Vec<ServiceRecord>, RegistryError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(RegistryError::Decode {
                url: "fake://catalog".into(),
                source: decode_error(),
            });
        }
        Ok(self.records.clone())
    }

    async fn kv_value(&self, path: &str) -> Result<Option<String>, RegistryError> {
        self.kv_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(RegistryError::Status {
                url: format!("fake://kv/{}", path),
                status: 502,
            });
        }
        Ok(self.scheme.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Health(String),
    Init(String),
    UnsealStart(String),
    UnsealDone(String),
}

#[derive(Debug, Default)]
struct FakeNode {
    initialized: bool,
    sealed: bool,
    health_fails: bool,
    accepted: HashSet<String>,
}

/// A Vault cluster sharing one barrier: init on any node initializes all,
/// each node is unsealed independently once `threshold` distinct issued
/// keys have been submitted to it.
pub(crate) struct FakeStore {
    nodes: Mutex<HashMap<String, FakeNode>>,
    issued: Mutex<Vec<String>>,
    threshold: Mutex<usize>,
    latencies: Vec<Duration>,
    submissions: AtomicUsize,
    events: Mutex<Vec<Event>>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            issued: Mutex::new(Vec::new()),
            threshold: Mutex::new(usize::MAX),
            latencies: Vec::new(),
            submissions: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// A node that was never initialized.
    pub(crate) fn with_fresh_node(self, url: &str) -> Self {
        self.nodes.lock().unwrap().insert(
            url.into(),
            FakeNode {
                sealed: true,
                ..FakeNode::default()
            },
        );
        self
    }

    /// A node of an already initialized cluster.
    pub(crate) fn with_node(self, url: &str, sealed: bool) -> Self {
        self.nodes.lock().unwrap().insert(
            url.into(),
            FakeNode {
                initialized: true,
                sealed,
                ..FakeNode::default()
            },
        );
        self
    }

    pub(crate) fn with_failing_health(self, url: &str) -> Self {
        if let Some(node) = self.nodes.lock().unwrap().get_mut(url) {
            node.health_fails = true;
        }
        self
    }

    /// Keys this cluster accepts, as if it had been initialized earlier.
    pub(crate) fn with_keys(self, keys: &[&str], threshold: usize) -> Self {
        *self.issued.lock().unwrap() = keys.iter().map(|k| k.to_string()).collect();
        *self.threshold.lock().unwrap() = threshold;
        self
    }

    /// Submission `i` sleeps `latencies[i % len]` before landing.
    pub(crate) fn with_latencies(mut self, millis: &[u64]) -> Self {
        self.latencies = millis.iter().map(|ms| Duration::from_millis(*ms)).collect();
        self
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.count(|e| matches!(e, Event::Init(_)))
    }

    pub(crate) fn unseal_calls(&self) -> usize {
        self.count(|e| matches!(e, Event::UnsealStart(_)))
    }

    pub(crate) fn health_calls(&self) -> usize {
        self.count(|e| matches!(e, Event::Health(_)))
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn unknown(url: &str) -> StoreError {
        StoreError::Status {
            url: url.into(),
            status: 404,
        }
    }
}

impl SecretStore for FakeStore {
    async fn health(&self, node_url: &str) -> Result<HealthStatus, StoreError> {
        self.record(Event::Health(node_url.into()));
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(node_url).ok_or_else(|| Self::unknown(node_url))?;
        if node.health_fails {
            return Err(StoreError::Decode {
                url: node_url.into(),
                source: decode_error(),
            });
        }
        Ok(HealthStatus {
            sealed: node.sealed,
            initialized: node.initialized,
        })
    }

    async fn init(
        &self,
        node_url: &str,
        shares: u8,
        threshold: u8,
    ) -> Result<InitResult, StoreError> {
        self.record(Event::Init(node_url.into()));
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.get(node_url).map_or(true, |n| n.initialized) {
            return Err(StoreError::Status {
                url: node_url.into(),
                status: 400,
            });
        }
        for node in nodes.values_mut() {
            node.initialized = true;
        }
        let keys: Vec<String> = (1..=shares).map(|i| format!("key-{}", i)).collect();
        *self.issued.lock().unwrap() = keys.clone();
        *self.threshold.lock().unwrap() = usize::from(threshold);
        Ok(InitResult {
            keys: keys.iter().map(|k| SecretString::new(format!("hex-{}", k))).collect(),
            keys_base64: keys.iter().map(|k| SecretString::from(k.as_str())).collect(),
            root_token: SecretString::from("s.fake-root"),
        })
    }

    async fn unseal(&self, node_url: &str, key: &SecretString) -> Result<(), StoreError> {
        self.record(Event::UnsealStart(node_url.into()));
        let i = self.submissions.fetch_add(1, Ordering::SeqCst);
        if !self.latencies.is_empty() {
            tokio::time::sleep(self.latencies[i % self.latencies.len()]).await;
        }

        let valid = self.issued.lock().unwrap().iter().any(|k| k == key.expose());
        let threshold = *self.threshold.lock().unwrap();
        {
            let mut nodes = self.nodes.lock().unwrap();
            let node = nodes.get_mut(node_url).ok_or_else(|| Self::unknown(node_url))?;
            if valid {
                node.accepted.insert(key.expose().to_owned());
            }
            if node.accepted.len() >= threshold {
                node.sealed = false;
            }
        }
        self.record(Event::UnsealDone(node_url.into()));
        if valid {
            Ok(())
        } else {
            Err(StoreError::Status {
                url: node_url.into(),
                status: 400,
            })
        }
    }
}
