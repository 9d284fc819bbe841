//! Application context
//!
//! Owns every cache component explicitly: the two tiers, the scheduler, the
//! orchestrator and the invalidation engine. Several independently
//! configured contexts can live in one process.

use crate::config::{AppConfig, validate_app_config};
use crate::constants::{HEALTH_CHECK_DISTRIBUTED, HEALTH_CHECK_INVALIDATION, HEALTH_CHECK_LOCAL};
use crate::health::checkers::{DistributedTierChecker, InvalidationChecker, LocalTierChecker};
use crate::health::{HealthRegistry, HealthReport};
use mlc_application::cache::MultiLevelCache;
use mlc_application::invalidation::InvalidationEngine;
use mlc_domain::error::Result;
use mlc_domain::value_objects::{
    CombinedStats, DistributedStats, InvalidationStats, NamespaceStats,
};
use mlc_providers::{DistributedCache, LocalCache, TokioScheduler};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything `stats` reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Per-tier and combined hit rates
    pub cache: CombinedStats,
    /// Local tier counters per namespace
    pub local: HashMap<String, NamespaceStats>,
    /// Distributed tier counters
    pub distributed: DistributedStats,
    /// Invalidation engine counters
    pub invalidation: InvalidationStats,
}

/// Explicitly constructed owner of the cache components
pub struct AppContext {
    config: AppConfig,
    scheduler: TokioScheduler,
    local: Arc<LocalCache>,
    distributed: Arc<DistributedCache>,
    cache: MultiLevelCache,
    engine: InvalidationEngine,
    health: HealthRegistry,
    pruner: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("cache", &self.cache)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Build every component from `config`
    ///
    /// Connecting the distributed tier never fails: an unreachable primary
    /// falls back as configured.
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        validate_app_config(&config)?;

        let local = Arc::new(LocalCache::new(config.local.clone()));
        let distributed = Arc::new(DistributedCache::connect(config.distributed.clone()).await);
        let scheduler = TokioScheduler::new();

        let cache = MultiLevelCache::new(
            Arc::clone(&local),
            Arc::clone(&distributed),
            Arc::new(scheduler.clone()),
            config.orchestrator.clone(),
        );
        let engine = InvalidationEngine::with_default_rules(
            cache.clone(),
            Arc::new(scheduler.clone()),
            config.invalidation.clone(),
        );

        let health = HealthRegistry::new();
        health
            .register_checker(
                HEALTH_CHECK_LOCAL.to_string(),
                LocalTierChecker::new(Arc::clone(&local)),
            )
            .await;
        health
            .register_checker(
                HEALTH_CHECK_DISTRIBUTED.to_string(),
                DistributedTierChecker::new(Arc::clone(&distributed)),
            )
            .await;
        health
            .register_checker(
                HEALTH_CHECK_INVALIDATION.to_string(),
                InvalidationChecker::new(engine.clone()),
            )
            .await;

        tracing::info!(
            backend = distributed.backend_name(),
            fallback = distributed.is_fallback(),
            "Cache context ready"
        );

        Ok(Self {
            config,
            scheduler,
            local,
            distributed,
            cache,
            engine,
            health,
            pruner: Mutex::new(None),
        })
    }

    /// Start background work: the local pruner and the periodic drain
    pub fn start(&self) {
        if let Some(interval) = self.config.local.prune_interval() {
            let handle = self.local.start_pruner(interval);
            if let Some(previous) = self.pruner.lock().replace(handle) {
                previous.abort();
            }
        }
        self.engine.start();
    }

    /// Stop background work
    ///
    /// Queued events and open batches are processed first; delayed
    /// invalidations and refresh-ahead reloads still pending are dropped.
    pub async fn shutdown(&self) {
        self.engine.stop();
        self.engine.process_queue().await;
        self.engine.flush_batches().await;
        self.cache.cancel_refreshes();
        if let Some(pruner) = self.pruner.lock().take() {
            pruner.abort();
        }
        self.scheduler.shutdown();
        tracing::info!("Cache context stopped");
    }

    /// Configuration in use
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Multi-level orchestrator
    pub fn cache(&self) -> &MultiLevelCache {
        &self.cache
    }

    /// Invalidation engine
    pub fn engine(&self) -> &InvalidationEngine {
        &self.engine
    }

    /// Local tier
    pub fn local(&self) -> &Arc<LocalCache> {
        &self.local
    }

    /// Distributed tier
    pub fn distributed(&self) -> &Arc<DistributedCache> {
        &self.distributed
    }

    /// Scheduler running deferred work
    pub fn scheduler(&self) -> &TokioScheduler {
        &self.scheduler
    }

    /// Counters of every component
    ///
    /// `namespace` restricts the local figures to one namespace.
    pub fn stats(&self, namespace: Option<&str>) -> StatsReport {
        let local = match namespace {
            Some(namespace) => self
                .local
                .get_stats(namespace)
                .map(|stats| HashMap::from([(namespace.to_string(), stats)]))
                .unwrap_or_default(),
            None => self.local.get_all_stats(),
        };
        StatsReport {
            cache: self.cache.get_stats(namespace),
            local,
            distributed: self.distributed.get_stats(),
            invalidation: self.engine.get_stats(),
        }
    }

    /// Health of every component
    pub async fn health(&self) -> HealthReport {
        self.health.perform_health_checks().await
    }

    /// Both tiers reachable and the engine keeping up
    pub async fn is_healthy(&self) -> bool {
        self.cache.is_healthy().await && self.engine.is_healthy()
    }
}
