//! Distributed cache client
//!
//! Namespaces keys, encodes values and counts outcomes on top of a
//! [`DistributedBackend`]. Every public operation absorbs backend errors:
//! they are logged, counted, and reported as a miss or `false`. The
//! `try_*` variants return the error instead, for callers that need to know
//! whether a deletion really happened.

use super::compression::{self, Encoded};
use super::config::{BackendTarget, DistributedConfig};
use super::memory::MemoryBackend;
use super::offline::OfflineBackend;
use mlc_domain::constants::NAMESPACE_SEPARATOR;
use mlc_domain::error::{Error, Result};
use mlc_domain::ports::{DistributedBackend, KeyTtl};
use mlc_domain::value_objects::{DistributedStats, DistributedTierOptions, KeyPattern, escape_glob};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Weight of the newest sample in the compression ratio average
const RATIO_SMOOTHING: f64 = 0.1;

/// Keys removed per backend DEL during a pattern clear
const CLEAR_CHUNK: usize = 500;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

/// Client for the distributed tier
#[derive(Debug)]
pub struct DistributedCache {
    backend: Arc<dyn DistributedBackend>,
    config: DistributedConfig,
    fallback: bool,
    counters: Counters,
    compression_ratio: Mutex<Option<f64>>,
}

impl DistributedCache {
    /// Wrap an existing backend
    pub fn new(backend: Arc<dyn DistributedBackend>, config: DistributedConfig) -> Self {
        Self {
            backend,
            config,
            fallback: false,
            counters: Counters::default(),
            compression_ratio: Mutex::new(None),
        }
    }

    /// Client over a fresh in-memory backend
    pub fn in_memory(config: DistributedConfig) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), config)
    }

    /// Connect to the primary backend, falling back once if it is unreachable
    ///
    /// The choice is final: no backend switching happens after startup. When
    /// the fallback cannot be opened either, the client runs offline and every
    /// call is a miss.
    pub async fn connect(config: DistributedConfig) -> Self {
        match open(&config.primary, config.connect_timeout()).await {
            Ok(backend) => {
                tracing::info!(backend = backend.backend_name(), "Distributed cache ready");
                return Self::new(backend, config);
            }
            Err(e) => tracing::warn!(
                primary = config.primary.kind(),
                fallback = config.fallback.kind(),
                error = %e,
                "Primary distributed backend unreachable, using fallback"
            ),
        }

        let backend = match open(&config.fallback, config.connect_timeout()).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(error = %e, "Fallback distributed backend unavailable, running offline");
                Arc::new(OfflineBackend)
            }
        };
        Self {
            fallback: true,
            ..Self::new(backend, config)
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &DistributedConfig {
        &self.config
    }

    /// TTL applied when a call does not override it
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl()
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Whether the client runs on its fallback backend
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Physical key: `<namespace>:<key>`
    pub fn full_key(&self, key: &str, options: &DistributedTierOptions) -> String {
        format!(
            "{}{NAMESPACE_SEPARATOR}{key}",
            options.effective_namespace(&self.config.namespace)
        )
    }

    fn expiry(&self, options: &DistributedTierOptions) -> Option<Duration> {
        Some(options.effective_ttl(self.config.default_ttl())).filter(|ttl| !ttl.is_zero())
    }

    fn record_error(&self, operation: &str, key: &str, error: &Error) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(operation, key, error = %error, "Distributed cache operation failed");
    }

    fn record_ratio(&self, ratio: f64) {
        let mut current = self.compression_ratio.lock();
        *current = Some(match *current {
            Some(previous) => previous * (1.0 - RATIO_SMOOTHING) + ratio * RATIO_SMOOTHING,
            None => ratio,
        });
    }

    fn encode<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &DistributedTierOptions,
    ) -> Option<String> {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize distributed cache value");
                return None;
            }
        };
        let compress = options.compress.unwrap_or(self.config.compression);
        match compression::encode(json, compress, self.config.compression_threshold) {
            Ok(Encoded { payload, ratio }) => {
                if let Some(ratio) = ratio {
                    self.record_ratio(ratio);
                }
                Some(payload)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to compress distributed cache value");
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(raw: String) -> Result<T> {
        let json = compression::decode(raw)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Get a value; errors and undecodable payloads are misses
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &DistributedTierOptions,
    ) -> Option<T> {
        let full_key = self.full_key(key, options);
        match self.backend.get(&full_key).await {
            Ok(Some(raw)) => match Self::decode(raw) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    Some(value)
                }
                Err(e) => {
                    self.record_error("get", &full_key, &e);
                    None
                }
            },
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.record_error("get", &full_key, &e);
                None
            }
        }
    }

    /// Store a value; `false` on serialization or backend failure
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &DistributedTierOptions,
    ) -> bool {
        let full_key = self.full_key(key, options);
        let Some(payload) = self.encode(&full_key, value, options) else {
            return false;
        };
        match self
            .backend
            .set(&full_key, &payload, self.expiry(options))
            .await
        {
            Ok(()) => {
                self.counters.sets.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.record_error("set", &full_key, &e);
                false
            }
        }
    }

    /// Delete a key, `true` if it existed
    pub async fn del(&self, key: &str, options: &DistributedTierOptions) -> bool {
        self.try_del(&[key], options)
            .await
            .is_ok_and(|removed| removed > 0)
    }

    /// Delete keys, returning how many existed
    pub async fn try_del(&self, keys: &[&str], options: &DistributedTierOptions) -> Result<u64> {
        let full_keys: Vec<String> = keys.iter().map(|key| self.full_key(key, options)).collect();
        match self.backend.del(&full_keys).await {
            Ok(removed) => {
                self.counters.deletes.fetch_add(removed, Ordering::Relaxed);
                Ok(removed)
            }
            Err(e) => {
                self.record_error("del", &full_keys.join(","), &e);
                Err(e)
            }
        }
    }

    /// Whether a key exists; `false` on error
    pub async fn exists(&self, key: &str, options: &DistributedTierOptions) -> bool {
        let full_key = self.full_key(key, options);
        match self.backend.exists(&full_key).await {
            Ok(exists) => exists,
            Err(e) => {
                self.record_error("exists", &full_key, &e);
                false
            }
        }
    }

    /// Get several values, positionally aligned with `keys`
    pub async fn mget<T: DeserializeOwned>(
        &self,
        keys: &[String],
        options: &DistributedTierOptions,
    ) -> Vec<Option<T>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let full_keys: Vec<String> = keys.iter().map(|key| self.full_key(key, options)).collect();
        let raw_values = match self.backend.mget(&full_keys).await {
            Ok(values) => values,
            Err(e) => {
                self.record_error("mget", &full_keys.join(","), &e);
                return keys.iter().map(|_| None).collect();
            }
        };

        full_keys
            .iter()
            .zip(raw_values)
            .map(|(full_key, raw)| match raw {
                Some(raw) => match Self::decode(raw) {
                    Ok(value) => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        Some(value)
                    }
                    Err(e) => {
                        self.record_error("mget", full_key, &e);
                        None
                    }
                },
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            })
            .collect()
    }

    /// Store several values sharing one TTL; `false` if any cannot be encoded
    pub async fn mset<T: Serialize>(
        &self,
        entries: &[(String, T)],
        options: &DistributedTierOptions,
    ) -> bool {
        if entries.is_empty() {
            return true;
        }
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let full_key = self.full_key(key, options);
            let Some(payload) = self.encode(&full_key, value, options) else {
                return false;
            };
            encoded.push((full_key, payload));
        }

        match self.backend.mset(&encoded, self.expiry(options)).await {
            Ok(()) => {
                self.counters
                    .sets
                    .fetch_add(encoded.len() as u64, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.record_error("mset", &format!("{} keys", encoded.len()), &e);
                false
            }
        }
    }

    /// Delete every key of the namespace covered by `pattern` (all when `None`)
    ///
    /// `false` when the backend cannot scan or the call fails.
    pub async fn clear(&self, pattern: Option<&KeyPattern>, options: &DistributedTierOptions) -> bool {
        self.try_clear(pattern, options).await.is_ok()
    }

    /// Scan-and-delete, returning how many keys were removed
    pub async fn try_clear(
        &self,
        pattern: Option<&KeyPattern>,
        options: &DistributedTierOptions,
    ) -> Result<u64> {
        if !self.backend.supports_scan() {
            tracing::debug!(
                backend = self.backend.backend_name(),
                "Pattern clear requested on a backend without key scans"
            );
            return Err(Error::unsupported(self.backend.backend_name(), "scan"));
        }

        let glob = format!(
            "{}{NAMESPACE_SEPARATOR}{}",
            escape_glob(options.effective_namespace(&self.config.namespace)),
            pattern.map_or_else(|| KeyPattern::all().to_glob(), KeyPattern::to_glob)
        );
        let keys = self.backend.scan(&glob).await.inspect_err(|e| {
            self.record_error("scan", &glob, e);
        })?;

        let mut removed = 0;
        for chunk in keys.chunks(CLEAR_CHUNK) {
            removed += self.backend.del(chunk).await.inspect_err(|e| {
                self.record_error("del", &glob, e);
            })?;
        }
        self.counters.deletes.fetch_add(removed, Ordering::Relaxed);
        tracing::debug!(pattern = %glob, removed, "Cleared distributed keys");
        Ok(removed)
    }

    /// Remaining lifetime of a key; [`KeyTtl::Missing`] on error
    pub async fn ttl(&self, key: &str, options: &DistributedTierOptions) -> KeyTtl {
        let full_key = self.full_key(key, options);
        match self.backend.ttl(&full_key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                self.record_error("ttl", &full_key, &e);
                KeyTtl::Missing
            }
        }
    }

    /// Reset the expiry of an existing key; `false` if missing or on error
    pub async fn expire(&self, key: &str, ttl: Duration, options: &DistributedTierOptions) -> bool {
        let full_key = self.full_key(key, options);
        match self.backend.expire(&full_key, ttl).await {
            Ok(updated) => updated,
            Err(e) => {
                self.record_error("expire", &full_key, &e);
                false
            }
        }
    }

    /// Whether the backend answers a ping
    pub async fn is_healthy(&self) -> bool {
        self.backend.ping().await.is_ok()
    }

    /// Snapshot of the counters
    pub fn get_stats(&self) -> DistributedStats {
        DistributedStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            compression_ratio: self.compression_ratio.lock().unwrap_or(1.0),
            backend: self.backend.backend_name().to_string(),
            fallback: self.fallback,
        }
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.hits,
            &self.counters.misses,
            &self.counters.sets,
            &self.counters.deletes,
            &self.counters.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.compression_ratio.lock() = None;
    }
}

async fn open(target: &BackendTarget, timeout: Duration) -> Result<Arc<dyn DistributedBackend>> {
    match target {
        BackendTarget::Redis { url } => open_redis(url, timeout).await,
        BackendTarget::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendTarget::Disabled => Ok(Arc::new(OfflineBackend)),
    }
}

#[cfg(feature = "cache-redis")]
async fn open_redis(url: &str, timeout: Duration) -> Result<Arc<dyn DistributedBackend>> {
    let backend = super::redis::RedisBackend::connect(url, timeout).await?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "cache-redis"))]
async fn open_redis(_url: &str, _timeout: Duration) -> Result<Arc<dyn DistributedBackend>> {
    Err(Error::unsupported("redis", "connect (built without cache-redis)"))
}
