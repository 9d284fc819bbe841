//! One namespace of the local tier
//!
//! An unbounded [`LruCache`] whose bounds are enforced here, so both the
//! entry count and the byte budget evict from the same recency order.

use super::config::NamespaceConfig;
use lru::LruCache;
use mlc_domain::value_objects::{KeyPattern, NamespaceStats};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// A stored value with its access metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Cached value
    pub value: T,
    /// When the value was written
    pub created_at: Instant,
    /// Last read or write
    pub accessed_at: Instant,
    /// Number of reads since the write
    pub access_count: u64,
}

#[derive(Debug)]
pub(crate) struct StoredEntry {
    pub(crate) entry: CacheEntry<Value>,
    expires_at: Option<Instant>,
    size: usize,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
pub(crate) struct Namespace {
    entries: LruCache<String, StoredEntry>,
    config: NamespaceConfig,
    bytes: usize,
    stats: NamespaceStats,
}

impl Namespace {
    pub(crate) fn new(config: NamespaceConfig) -> Self {
        Self {
            entries: LruCache::unbounded(),
            config,
            bytes: 0,
            stats: NamespaceStats::default(),
        }
    }

    pub(crate) fn reconfigure(&mut self, config: NamespaceConfig) {
        self.config = config;
        self.evict_to_bounds();
    }

    /// Read a live value, refreshing its recency
    pub(crate) fn get(&mut self, key: &str, now: Instant) -> Option<Value> {
        let expired = match self.entries.peek(key) {
            Some(stored) => stored.is_expired(now),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };
        if expired {
            self.expire(key);
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        let stored = self.entries.get_mut(key)?;
        stored.entry.accessed_at = now;
        stored.entry.access_count += 1;
        Some(stored.entry.value.clone())
    }

    /// Whether a live value exists, without touching recency or counters
    pub(crate) fn contains(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.peek(key).map(|stored| stored.is_expired(now)) {
            Some(false) => true,
            Some(true) => {
                self.expire(key);
                false
            }
            None => false,
        }
    }

    /// Store a value; `false` when it alone exceeds the byte budget
    pub(crate) fn insert(
        &mut self,
        key: String,
        value: Value,
        size: usize,
        ttl: Option<Duration>,
        now: Instant,
    ) -> bool {
        if size > self.config.max_bytes {
            return false;
        }
        if let Some(previous) = self.entries.pop(&key) {
            self.bytes -= previous.size;
        }

        let ttl = ttl.or_else(|| self.config.ttl());
        self.entries.push(
            key,
            StoredEntry {
                entry: CacheEntry {
                    value,
                    created_at: now,
                    accessed_at: now,
                    access_count: 0,
                },
                expires_at: ttl.map(|ttl| now + ttl),
                size,
            },
        );
        self.bytes += size;
        self.stats.sets += 1;
        self.evict_to_bounds();
        true
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(stored) => {
                self.bytes -= stored.size;
                self.stats.deletes += 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_matching(&mut self, pattern: &KeyPattern) -> usize {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        matching.iter().filter(|key| self.remove(key)).count()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    /// Drop every expired entry
    pub(crate) fn prune(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, stored)| stored.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.expire(key);
        }
        expired.len()
    }

    /// Live entries, most recently used first
    pub(crate) fn live(&self, now: Instant) -> impl Iterator<Item = (&String, &StoredEntry)> {
        self.entries
            .iter()
            .filter(move |(_, stored)| !stored.is_expired(now))
    }

    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn stats(&self) -> NamespaceStats {
        NamespaceStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            ..self.stats.clone()
        }
    }

    pub(crate) fn reset_stats(&mut self) {
        self.stats = NamespaceStats::default();
    }

    fn expire(&mut self, key: &str) {
        if let Some(stored) = self.entries.pop(key) {
            self.bytes -= stored.size;
            self.stats.expirations += 1;
        }
    }

    fn evict_to_bounds(&mut self) {
        while self.entries.len() > self.config.capacity() || self.bytes > self.config.max_bytes {
            match self.entries.pop_lru() {
                Some((_, evicted)) => {
                    self.bytes -= evicted.size;
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }
}
