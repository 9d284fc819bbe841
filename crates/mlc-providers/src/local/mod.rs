//! Local bounded cache
//!
//! In-process tier partitioned into namespaces. Each namespace is bounded by
//! entry count and by an approximate serialized size, evicts the least
//! recently used entry first, and expires entries by absolute TTL.
//!
//! ## Example
//!
//! ```ignore
//! use mlc_providers::local::{LocalCache, LocalCacheConfig};
//!
//! let cache = LocalCache::new(LocalCacheConfig::default());
//! cache.set("prices", "price:ETH", &3000u64, None);
//! assert_eq!(cache.get::<u64>("prices", "price:ETH"), Some(3000));
//! ```

mod config;
mod namespace;

pub use config::{LocalCacheConfig, NamespaceConfig};
pub use namespace::CacheEntry;

use dashmap::DashMap;
use mlc_domain::value_objects::{KeyPattern, NamespaceStats, hit_rate};
use namespace::Namespace;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Namespace-partitioned in-process cache
///
/// Namespaces are created on first use with the bounds from
/// [`LocalCacheConfig::namespace_config`]. Locks are never held across an
/// await point.
#[derive(Debug, Default)]
pub struct LocalCache {
    config: LocalCacheConfig,
    namespaces: DashMap<String, Arc<Mutex<Namespace>>>,
}

impl LocalCache {
    /// Create a local cache
    pub fn new(config: LocalCacheConfig) -> Self {
        Self {
            config,
            namespaces: DashMap::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &LocalCacheConfig {
        &self.config
    }

    fn namespace(&self, name: &str) -> Arc<Mutex<Namespace>> {
        if let Some(existing) = self.namespaces.get(name) {
            return Arc::clone(existing.value());
        }
        let created = self
            .namespaces
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Namespace::new(self.config.namespace_config(name)))));
        Arc::clone(created.value())
    }

    fn existing(&self, name: &str) -> Option<Arc<Mutex<Namespace>>> {
        self.namespaces.get(name).map(|ns| Arc::clone(ns.value()))
    }

    fn all_namespaces(&self) -> Vec<(String, Arc<Mutex<Namespace>>)> {
        self.namespaces
            .iter()
            .map(|ns| (ns.key().clone(), Arc::clone(ns.value())))
            .collect()
    }

    /// Apply bounds to a namespace, creating it if needed
    ///
    /// Shrinking an existing namespace evicts down to the new bounds.
    pub fn configure_namespace(&self, name: &str, config: NamespaceConfig) {
        self.namespace(name).lock().reconfigure(config);
    }

    /// Whether the namespace has been created
    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// Get a value, refreshing its recency
    ///
    /// A stored value that does not deserialize into `T` is reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let value = self.namespace(namespace).lock().get(key, Instant::now())?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(namespace, key, error = %e, "Local entry has an unexpected shape");
                None
            }
        }
    }

    /// Store a value
    ///
    /// Returns `false` when the value cannot be serialized or alone exceeds the
    /// namespace byte budget. Never panics.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let (value, size) = match serde_json::to_value(value) {
            Ok(value) => {
                let size = key.len() + value.to_string().len();
                (value, size)
            }
            Err(e) => {
                tracing::warn!(namespace, key, error = %e, "Failed to serialize local cache value");
                return false;
            }
        };

        let stored =
            self.namespace(namespace)
                .lock()
                .insert(key.to_string(), value, size, ttl, Instant::now());
        if !stored {
            tracing::warn!(namespace, key, size, "Value exceeds the namespace byte budget");
        }
        stored
    }

    /// Whether a live entry exists (does not count as an access)
    pub fn has(&self, namespace: &str, key: &str) -> bool {
        self.existing(namespace)
            .is_some_and(|ns| ns.lock().contains(key, Instant::now()))
    }

    /// Remove an entry, `true` if it existed
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        self.existing(namespace).is_some_and(|ns| ns.lock().remove(key))
    }

    /// Remove every entry covered by `pattern`
    ///
    /// With no namespace, every namespace is swept.
    pub fn delete_matching(&self, namespace: Option<&str>, pattern: &KeyPattern) -> usize {
        match namespace {
            Some(name) => self
                .existing(name)
                .map_or(0, |ns| ns.lock().remove_matching(pattern)),
            None => self
                .all_namespaces()
                .into_iter()
                .map(|(_, ns)| ns.lock().remove_matching(pattern))
                .sum(),
        }
    }

    /// Remove every entry of a namespace, keeping its stats
    pub fn clear(&self, namespace: &str) {
        if let Some(ns) = self.existing(namespace) {
            ns.lock().clear();
        }
    }

    /// Remove every entry of every namespace
    pub fn clear_all(&self) {
        for (_, ns) in self.all_namespaces() {
            ns.lock().clear();
        }
    }

    /// Live keys, most recently used first
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.existing(namespace).map_or_else(Vec::new, |ns| {
            ns.lock()
                .live(Instant::now())
                .map(|(key, _)| key.clone())
                .collect()
        })
    }

    /// Live values, most recently used first
    pub fn values(&self, namespace: &str) -> Vec<Value> {
        self.existing(namespace).map_or_else(Vec::new, |ns| {
            ns.lock()
                .live(Instant::now())
                .map(|(_, stored)| stored.entry.value.clone())
                .collect()
        })
    }

    /// Live key/value pairs, most recently used first
    pub fn entries(&self, namespace: &str) -> Vec<(String, Value)> {
        self.existing(namespace).map_or_else(Vec::new, |ns| {
            ns.lock()
                .live(Instant::now())
                .map(|(key, stored)| (key.clone(), stored.entry.value.clone()))
                .collect()
        })
    }

    /// Number of live entries
    pub fn size(&self, namespace: &str) -> usize {
        self.existing(namespace)
            .map_or(0, |ns| ns.lock().live(Instant::now()).count())
    }

    /// Stats of one namespace
    pub fn get_stats(&self, namespace: &str) -> Option<NamespaceStats> {
        self.existing(namespace).map(|ns| ns.lock().stats())
    }

    /// Stats of every namespace
    pub fn get_all_stats(&self) -> HashMap<String, NamespaceStats> {
        self.all_namespaces()
            .into_iter()
            .map(|(name, ns)| {
                let stats = ns.lock().stats();
                (name, stats)
            })
            .collect()
    }

    /// Reset counters of one namespace, or of all when `None`
    pub fn reset_stats(&self, namespace: Option<&str>) {
        match namespace {
            Some(name) => {
                if let Some(ns) = self.existing(name) {
                    ns.lock().reset_stats();
                }
            }
            None => {
                for (_, ns) in self.all_namespaces() {
                    ns.lock().reset_stats();
                }
            }
        }
    }

    /// Hit rate of one namespace, or across all when `None`
    pub fn get_hit_rate(&self, namespace: Option<&str>) -> f64 {
        let (hits, misses) = self.counters(namespace);
        hit_rate(hits, misses)
    }

    /// Summed hits and misses of one namespace, or of all when `None`
    pub fn counters(&self, namespace: Option<&str>) -> (u64, u64) {
        match namespace {
            Some(name) => self
                .get_stats(name)
                .map_or((0, 0), |stats| (stats.hits, stats.misses)),
            None => self
                .get_all_stats()
                .values()
                .fold((0, 0), |(hits, misses), stats| {
                    (hits + stats.hits, misses + stats.misses)
                }),
        }
    }

    /// Entries with the highest access count
    pub fn get_most_accessed(&self, namespace: &str, limit: usize) -> Vec<(String, CacheEntry<Value>)> {
        let mut entries = self.snapshot(namespace);
        entries.sort_by(|a, b| b.1.access_count.cmp(&a.1.access_count));
        entries.truncate(limit);
        entries
    }

    /// Entries with the earliest creation time
    pub fn get_oldest(&self, namespace: &str, limit: usize) -> Vec<(String, CacheEntry<Value>)> {
        let mut entries = self.snapshot(namespace);
        entries.sort_by_key(|(_, entry)| entry.created_at);
        entries.truncate(limit);
        entries
    }

    fn snapshot(&self, namespace: &str) -> Vec<(String, CacheEntry<Value>)> {
        self.existing(namespace).map_or_else(Vec::new, |ns| {
            ns.lock()
                .live(Instant::now())
                .map(|(key, stored)| (key.clone(), stored.entry.clone()))
                .collect()
        })
    }

    /// Drop expired entries everywhere, returning how many were dropped
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let pruned: usize = self
            .all_namespaces()
            .into_iter()
            .map(|(_, ns)| ns.lock().prune(now))
            .sum();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired local cache entries");
        }
        pruned
    }

    /// Drop a namespace with its entries and stats
    pub fn delete_namespace(&self, namespace: &str) -> bool {
        self.namespaces.remove(namespace).is_some()
    }

    /// Names of every namespace, sorted
    pub fn get_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|ns| ns.key().clone()).collect();
        names.sort();
        names
    }

    /// Approximate serialized size of everything stored, in bytes
    pub fn get_memory_usage(&self) -> usize {
        self.all_namespaces()
            .into_iter()
            .map(|(_, ns)| ns.lock().bytes())
            .sum()
    }

    /// Spawn a task pruning expired entries every `interval`
    ///
    /// The task ends on its own once the cache is dropped.
    pub fn start_pruner(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.prune();
            }
        })
    }
}
