//! In-process distributed backend
//!
//! Stands in for Redis when it is unreachable at startup, and serves as the
//! test double for the distributed tier. Two switches let tests reproduce
//! backend conditions: scan support and a failure mode where every call
//! reports a connection error.

use async_trait::async_trait;
use dashmap::DashMap;
use globset::GlobBuilder;
use mlc_domain::error::{Error, Result};
use mlc_domain::ports::{DistributedBackend, KeyTtl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Memory-backed [`DistributedBackend`]
#[derive(Debug)]
pub struct MemoryBackend {
    entries: DashMap<String, StoredValue>,
    scan_supported: AtomicBool,
    failing: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with scan support
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            scan_supported: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }

    /// Create a backend that rejects key scans
    pub fn without_scan() -> Self {
        let backend = Self::new();
        backend.set_scan_supported(false);
        backend
    }

    /// Toggle key scan support
    pub fn set_scan_supported(&self, supported: bool) {
        self.scan_supported.store(supported, Ordering::SeqCst);
    }

    /// Toggle failure mode
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored keys, expired ones included until touched
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::connection("memory backend is in failure mode"))
        } else {
            Ok(())
        }
    }

    fn live(&self, key: &str, now: Instant) -> Option<StoredValue> {
        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        self.entries.get(key).map(|stored| stored.value().clone())
    }

    fn store(&self, key: &str, value: &str, ttl: Option<Duration>, now: Instant) {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
    }
}

#[async_trait]
impl DistributedBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.live(key, Instant::now()).map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.check()?;
        self.store(key, value, ttl, Instant::now());
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.check()?;
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, stored)| !stored.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check()?;
        Ok(self.live(key, Instant::now()).is_some())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check()?;
        let now = Instant::now();
        Ok(keys
            .iter()
            .map(|key| self.live(key, now).map(|stored| stored.value))
            .collect())
    }

    async fn mset(&self, entries: &[(String, String)], ttl: Option<Duration>) -> Result<()> {
        self.check()?;
        let now = Instant::now();
        for (key, value) in entries {
            self.store(key, value, ttl, now);
        }
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        self.check()?;
        if !self.scan_supported.load(Ordering::SeqCst) {
            return Err(Error::unsupported(self.backend_name(), "scan"));
        }
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| Error::cache(format!("invalid scan pattern {pattern}: {e}")))?
            .compile_matcher();

        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn supports_scan(&self) -> bool {
        self.scan_supported.load(Ordering::SeqCst)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.check()?;
        let now = Instant::now();
        Ok(match self.live(key, now) {
            None => KeyTtl::Missing,
            Some(StoredValue {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(StoredValue {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(at.saturating_duration_since(now)),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check()?;
        let now = Instant::now();
        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        Ok(match self.entries.get_mut(key) {
            Some(mut stored) => {
                stored.expires_at = Some(now + ttl);
                true
            }
            None => false,
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
