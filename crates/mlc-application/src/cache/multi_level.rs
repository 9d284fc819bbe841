//! Multi-Level Orchestrator
//!
//! Binds the local and distributed tiers under a per-call [`CacheStrategy`]:
//! read-through with validation and backfill, write-through or write-back,
//! refresh-ahead with process-local single-flight, batch reads and writes,
//! and warmup.
//!
//! No lock is held while a tier call is suspended. The only shared mutable
//! state is the refresh-ahead map.

use super::config::OrchestratorConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use mlc_domain::error::{Error, Result};
use mlc_domain::ports::{DeferredTask, KeyTtl, Loader, ScheduledTask, TaskScheduler, Validator};
use mlc_domain::value_objects::{
    CacheStrategy, CombinedStats, KeyPattern, MemoryTierOptions, TierStats, WarmupFailure,
    WarmupReport,
};
use mlc_providers::local::NamespaceConfig;
use mlc_providers::{DistributedCache, LocalCache};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Values the orchestrator can cache
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Refresh-ahead bookkeeping for one key
#[derive(Debug)]
enum RefreshSlot {
    /// A caller is reading the key's TTL
    Checking,
    /// A reload was handed to the scheduler
    Scheduled(ScheduledTask),
}

impl RefreshSlot {
    fn is_active(&self) -> bool {
        match self {
            Self::Checking => true,
            Self::Scheduled(handle) => !handle.is_finished(),
        }
    }
}

/// Clears a `Checking` slot unless it was replaced by a scheduled reload
///
/// A `get` dropped while the TTL lookup is suspended must not leave the key
/// marked as busy.
struct CheckingGuard<'a> {
    refreshing: &'a DashMap<String, RefreshSlot>,
    key: &'a str,
    armed: bool,
}

impl CheckingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.refreshing
                .remove_if(self.key, |_, slot| matches!(slot, RefreshSlot::Checking));
        }
    }
}

/// Reachability of each tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierHealth {
    /// Local tier (always reachable)
    pub local: bool,
    /// Distributed tier answered a ping
    pub distributed: bool,
}

struct Inner {
    local: Arc<LocalCache>,
    distributed: Arc<DistributedCache>,
    scheduler: Arc<dyn TaskScheduler>,
    config: OrchestratorConfig,
    refreshing: DashMap<String, RefreshSlot>,
}

/// Strategy-driven facade over both tiers
///
/// Cheap to clone; clones share the tiers and the refresh-ahead map.
#[derive(Clone)]
pub struct MultiLevelCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MultiLevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLevelCache")
            .field("namespaces", &self.inner.local.get_namespaces())
            .field("backend", &self.inner.distributed.backend_name())
            .field("refreshing", &self.inner.refreshing.len())
            .finish_non_exhaustive()
    }
}

impl MultiLevelCache {
    /// Create an orchestrator over existing tiers
    pub fn new(
        local: Arc<LocalCache>,
        distributed: Arc<DistributedCache>,
        scheduler: Arc<dyn TaskScheduler>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                local,
                distributed,
                scheduler,
                config,
                refreshing: DashMap::new(),
            }),
        }
    }

    /// Local tier
    pub fn local(&self) -> &Arc<LocalCache> {
        &self.inner.local
    }

    /// Distributed tier
    pub fn distributed(&self) -> &Arc<DistributedCache> {
        &self.inner.distributed
    }

    /// Configuration in use
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    fn prepare_namespace(&self, memory: &MemoryTierOptions) {
        let Some(max_entries) = memory.max_entries else {
            return;
        };
        let local = &self.inner.local;
        if !local.has_namespace(&memory.namespace) {
            let config: NamespaceConfig = local
                .config()
                .namespace_config(&memory.namespace)
                .with_max_entries(max_entries);
            local.configure_namespace(&memory.namespace, config);
        }
    }

    fn write_local<T: Serialize>(&self, key: &str, value: &T, memory: &MemoryTierOptions) -> bool {
        self.prepare_namespace(memory);
        self.inner
            .local
            .set(&memory.namespace, key, value, memory.ttl)
    }

    /// Read through both tiers
    ///
    /// Local first, then distributed (backfilling local on a hit), then the
    /// loader. A value rejected by `validator` is treated as a miss; a
    /// rejected local entry is evicted. Without a loader a total miss
    /// returns `None`.
    pub async fn get<T: Cacheable>(
        &self,
        key: &str,
        strategy: &CacheStrategy,
        loader: Option<&Loader<T>>,
        validator: Option<&Validator<T>>,
    ) -> Option<T> {
        let is_valid = |value: &T| validator.is_none_or(|validate| validate(value));

        if let Some(memory) = &strategy.memory {
            if let Some(value) = self.inner.local.get::<T>(&memory.namespace, key) {
                if is_valid(&value) {
                    self.maybe_refresh_ahead(key, strategy, loader).await;
                    return Some(value);
                }
                tracing::debug!(key, namespace = %memory.namespace, "Local entry failed validation");
                self.inner.local.delete(&memory.namespace, key);
            }
        }

        if let Some(distributed) = &strategy.distributed {
            if let Some(value) = self.inner.distributed.get::<T>(key, distributed).await {
                if is_valid(&value) {
                    if let Some(memory) = &strategy.memory {
                        self.write_local(key, &value, memory);
                    }
                    self.maybe_refresh_ahead(key, strategy, loader).await;
                    return Some(value);
                }
                tracing::debug!(key, "Distributed entry failed validation");
            }
        }

        let loader = loader?;
        let value = match loader(key.to_string()).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Loader failed");
                return None;
            }
        };
        if !is_valid(&value) {
            tracing::debug!(key, "Loaded value failed validation, not caching");
            return None;
        }
        if !self.set(key, &value, strategy).await {
            tracing::debug!(key, "Loaded value could not be cached in every tier");
        }
        Some(value)
    }

    /// Write to the enabled tiers
    ///
    /// Write-through returns `true` only when every attempted tier accepted
    /// the value; a tier that succeeded is not rolled back. Write-back
    /// returns the local outcome and pushes to the distributed tier in a
    /// deferred task whose failure is only logged.
    pub async fn set<T: Cacheable>(&self, key: &str, value: &T, strategy: &CacheStrategy) -> bool {
        let local_ok = strategy
            .memory
            .as_ref()
            .is_none_or(|memory| self.write_local(key, value, memory));

        let Some(distributed) = &strategy.distributed else {
            return local_ok;
        };

        if strategy.is_write_back() {
            let value = match serde_json::to_value(value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key, error = %e, "Failed to serialize write-back value");
                    return false;
                }
            };
            let cache = Arc::clone(&self.inner.distributed);
            let key = key.to_string();
            let options = distributed.clone();
            self.inner.scheduler.spawn(Box::pin(async move {
                if !cache.set(&key, &value, &options).await {
                    tracing::warn!(key = %key, "Deferred distributed write failed");
                }
            }));
            return local_ok;
        }

        let remote_ok = self.inner.distributed.set(key, value, distributed).await;
        if local_ok != remote_ok {
            tracing::warn!(key, local_ok, remote_ok, "Write-through set reached only one tier");
        }
        local_ok && remote_ok
    }

    /// Read several keys, positionally aligned with `keys`
    ///
    /// Only local misses are requested from the distributed tier; its hits
    /// are backfilled locally.
    pub async fn mget<T: Cacheable>(&self, keys: &[String], strategy: &CacheStrategy) -> Vec<Option<T>> {
        let mut results: Vec<Option<T>> = match &strategy.memory {
            Some(memory) => keys
                .iter()
                .map(|key| self.inner.local.get::<T>(&memory.namespace, key))
                .collect(),
            None => std::iter::repeat_with(|| None).take(keys.len()).collect(),
        };

        let Some(distributed) = &strategy.distributed else {
            return results;
        };
        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.is_none().then_some(index))
            .collect();
        if missing.is_empty() {
            return results;
        }

        let missing_keys: Vec<String> = missing.iter().map(|&index| keys[index].clone()).collect();
        let fetched = self.inner.distributed.mget::<T>(&missing_keys, distributed).await;
        for (index, value) in missing.into_iter().zip(fetched) {
            if let Some(value) = value {
                if let Some(memory) = &strategy.memory {
                    self.write_local(&keys[index], &value, memory);
                }
                results[index] = Some(value);
            }
        }
        results
    }

    /// Write several entries to the enabled tiers
    ///
    /// The distributed write is one batched call, deferred under write-back.
    pub async fn mset<T: Cacheable>(&self, entries: &[(String, T)], strategy: &CacheStrategy) -> bool {
        let local_ok = match &strategy.memory {
            Some(memory) => entries
                .iter()
                .map(|(key, value)| self.write_local(key, value, memory))
                .fold(true, |all, ok| all && ok),
            None => true,
        };

        let Some(distributed) = &strategy.distributed else {
            return local_ok;
        };

        if strategy.is_write_back() {
            let mut values = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                match serde_json::to_value(value) {
                    Ok(value) => values.push((key.clone(), value)),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to serialize write-back value");
                        return false;
                    }
                }
            }
            let cache = Arc::clone(&self.inner.distributed);
            let options = distributed.clone();
            self.inner.scheduler.spawn(Box::pin(async move {
                if !cache.mset(&values, &options).await {
                    tracing::warn!(entries = values.len(), "Deferred distributed batch write failed");
                }
            }));
            return local_ok;
        }

        let remote_ok = self.inner.distributed.mset(entries, distributed).await;
        local_ok && remote_ok
    }

    /// Delete a key from every enabled tier
    ///
    /// `true` when every attempted tier completed without error, whether or
    /// not the key existed.
    pub async fn delete(&self, key: &str, strategy: &CacheStrategy) -> bool {
        if let Some(memory) = &strategy.memory {
            self.inner.local.delete(&memory.namespace, key);
        }
        match &strategy.distributed {
            Some(distributed) => self.inner.distributed.try_del(&[key], distributed).await.is_ok(),
            None => true,
        }
    }

    /// Whether any enabled tier holds the key
    pub async fn exists(&self, key: &str, strategy: &CacheStrategy) -> bool {
        if let Some(memory) = &strategy.memory {
            if self.inner.local.has(&memory.namespace, key) {
                return true;
            }
        }
        match &strategy.distributed {
            Some(distributed) => self.inner.distributed.exists(key, distributed).await,
            None => false,
        }
    }

    /// Clear the enabled tiers
    ///
    /// Without a pattern every local namespace (or only `namespace`) is
    /// emptied and the distributed namespace is scan-deleted. With a pattern
    /// only matching keys go. `false` when the distributed tier could not
    /// scan or failed.
    pub async fn clear(
        &self,
        pattern: Option<&KeyPattern>,
        namespace: Option<&str>,
        strategy: &CacheStrategy,
    ) -> bool {
        if strategy.uses_memory() {
            let local = &self.inner.local;
            match (pattern, namespace) {
                (None, None) => local.clear_all(),
                (None, Some(namespace)) => local.clear(namespace),
                (Some(pattern), namespace) => {
                    local.delete_matching(namespace, pattern);
                }
            }
        }

        let Some(distributed) = &strategy.distributed else {
            return true;
        };
        let options = match namespace {
            Some(namespace) => distributed.clone().with_namespace(namespace),
            None => distributed.clone(),
        };
        match self.inner.distributed.try_clear(pattern, &options).await {
            Ok(removed) => {
                tracing::info!(removed, pattern = ?pattern.map(ToString::to_string), "Cache cleared");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Distributed clear failed");
                false
            }
        }
    }

    /// Invalidate one key or key family in both tiers
    ///
    /// The local side is swept across every namespace. Literal keys use
    /// point deletion in the distributed tier; prefixes use scan deletion.
    pub async fn invalidate(&self, pattern: &KeyPattern, strategy: &CacheStrategy) -> Result<()> {
        if strategy.uses_memory() {
            self.inner.local.delete_matching(None, pattern);
        }
        let Some(distributed) = &strategy.distributed else {
            return Ok(());
        };
        match pattern {
            KeyPattern::Literal(key) => {
                self.inner.distributed.try_del(&[key.as_str()], distributed).await?;
            }
            KeyPattern::Prefix(_) => {
                self.inner
                    .distributed
                    .try_clear(Some(pattern), distributed)
                    .await?;
            }
        }
        Ok(())
    }

    /// Populate keys ahead of demand
    ///
    /// Keys are processed in batches of `concurrency` (the configured default
    /// when `None`). Keys already cached count as successes without loading.
    pub async fn warmup<T: Cacheable>(
        &self,
        keys: &[String],
        loader: &Loader<T>,
        strategy: &CacheStrategy,
        concurrency: Option<usize>,
    ) -> WarmupReport {
        let concurrency = concurrency
            .unwrap_or(self.inner.config.warmup_concurrency)
            .max(1);
        let mut report = WarmupReport::default();

        for chunk in keys.chunks(concurrency) {
            let outcomes = join_all(chunk.iter().map(|key| self.warm_key(key, loader, strategy))).await;
            for (key, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(()) => report.successful += 1,
                    Err(e) => {
                        report.failed += 1;
                        report.errors.push(WarmupFailure {
                            key: key.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            successful = report.successful,
            failed = report.failed,
            "Cache warmup finished"
        );
        report
    }

    async fn warm_key<T: Cacheable>(
        &self,
        key: &str,
        loader: &Loader<T>,
        strategy: &CacheStrategy,
    ) -> Result<()> {
        if self.exists(key, strategy).await {
            return Ok(());
        }
        let value = loader(key.to_string()).await?;
        if self.set(key, &value, strategy).await {
            Ok(())
        } else {
            Err(Error::cache(format!("failed to store warmed value for {key}")))
        }
    }

    async fn maybe_refresh_ahead<T: Cacheable>(
        &self,
        key: &str,
        strategy: &CacheStrategy,
        loader: Option<&Loader<T>>,
    ) {
        let (Some(refresh), Some(distributed), Some(loader)) =
            (strategy.refresh_ahead, strategy.distributed.as_ref(), loader)
        else {
            return;
        };

        match self.inner.refreshing.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_active() {
                    return;
                }
                slot.insert(RefreshSlot::Checking);
            }
            Entry::Vacant(slot) => {
                slot.insert(RefreshSlot::Checking);
            }
        }

        let guard = CheckingGuard {
            refreshing: &self.inner.refreshing,
            key,
            armed: true,
        };

        let configured = strategy.distributed_ttl(self.inner.distributed.default_ttl());
        let remaining = self.inner.distributed.ttl(key, distributed).await;
        let below_threshold = match remaining {
            KeyTtl::Expires(remaining) if !configured.is_zero() => {
                remaining.as_secs_f64() / configured.as_secs_f64() < refresh.threshold
            }
            _ => false,
        };
        if !below_threshold {
            return;
        }

        tracing::debug!(key, ?remaining, "Scheduling refresh-ahead reload");
        let task = self.refresh_task(key.to_string(), Arc::clone(loader), strategy.clone());
        let handle = self.inner.scheduler.spawn(task);
        self.inner
            .refreshing
            .insert(key.to_string(), RefreshSlot::Scheduled(handle));
        guard.disarm();
    }

    fn refresh_task<T: Cacheable>(
        &self,
        key: String,
        loader: Loader<T>,
        strategy: CacheStrategy,
    ) -> DeferredTask {
        let cache = self.clone();
        Box::pin(async move {
            match loader(key.clone()).await {
                Ok(value) => {
                    if !cache.set(&key, &value, &strategy).await {
                        tracing::warn!(key = %key, "Refresh-ahead reload could not be stored");
                    }
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Refresh-ahead loader failed"),
            }
            cache.inner.refreshing.remove(&key);
        })
    }

    /// Keys with a refresh-ahead reload in flight
    pub fn pending_refreshes(&self) -> usize {
        self.inner
            .refreshing
            .iter()
            .filter(|slot| slot.value().is_active())
            .count()
    }

    /// Cancel every scheduled refresh-ahead reload
    pub fn cancel_refreshes(&self) {
        for slot in self.inner.refreshing.iter() {
            if let RefreshSlot::Scheduled(handle) = slot.value() {
                handle.cancel();
            }
        }
        self.inner.refreshing.clear();
    }

    /// Hits, misses and hit rate per tier and combined
    ///
    /// `namespace` restricts the local figures to one namespace.
    pub fn get_stats(&self, namespace: Option<&str>) -> CombinedStats {
        let (local_hits, local_misses) = self.inner.local.counters(namespace);
        let distributed = self.inner.distributed.get_stats();
        CombinedStats::from_tiers(
            TierStats::new(local_hits, local_misses),
            TierStats::new(distributed.hits, distributed.misses),
        )
    }

    /// Reachability of both tiers
    pub async fn health(&self) -> TierHealth {
        TierHealth {
            local: true,
            distributed: self.inner.distributed.is_healthy().await,
        }
    }

    /// Whether both tiers are reachable
    pub async fn is_healthy(&self) -> bool {
        let health = self.health().await;
        health.local && health.distributed
    }
}
