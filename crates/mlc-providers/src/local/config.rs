//! Local tier configuration

use mlc_domain::constants::{
    LOCAL_DEFAULT_MAX_BYTES, LOCAL_DEFAULT_MAX_ENTRIES, LOCAL_DEFAULT_TTL_SECS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Bounds applied to one local namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Maximum number of entries before the least recently used is evicted
    pub max_entries: usize,
    /// Maximum total serialized size of the namespace, in bytes
    pub max_bytes: usize,
    /// Default TTL in seconds (0 disables expiry)
    pub ttl_secs: u64,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            max_entries: LOCAL_DEFAULT_MAX_ENTRIES,
            max_bytes: LOCAL_DEFAULT_MAX_BYTES,
            ttl_secs: LOCAL_DEFAULT_TTL_SECS,
        }
    }
}

impl NamespaceConfig {
    /// Override the entry capacity
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Override the byte budget
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Override the default TTL
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Default TTL, `None` when entries never expire
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    /// Entry capacity, never below one
    pub(crate) fn capacity(&self) -> usize {
        self.max_entries.max(1)
    }
}

/// Local tier configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCacheConfig {
    /// Bounds for namespaces without an explicit entry
    pub defaults: NamespaceConfig,
    /// Per-namespace bounds
    pub namespaces: HashMap<String, NamespaceConfig>,
    /// Interval of the background pruner in seconds (0 disables it)
    pub prune_interval_secs: u64,
}

impl LocalCacheConfig {
    /// Bounds that apply to `namespace` when it is created
    pub fn namespace_config(&self, namespace: &str) -> NamespaceConfig {
        self.namespaces
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Register explicit bounds for a namespace
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S, config: NamespaceConfig) -> Self {
        self.namespaces.insert(namespace.into(), config);
        self
    }

    /// Pruner interval, `None` when disabled
    pub fn prune_interval(&self) -> Option<Duration> {
        (self.prune_interval_secs > 0).then(|| Duration::from_secs(self.prune_interval_secs))
    }
}
