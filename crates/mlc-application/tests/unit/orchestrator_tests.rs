//! Tests for the multi-level orchestrator

use futures::future::join_all;
use mlc_application::cache::{MultiLevelCache, OrchestratorConfig};
use mlc_domain::error::Error;
use mlc_domain::ports::{DistributedBackend, KeyTtl, Loader, loader_fn, validator_fn};
use mlc_domain::value_objects::{CacheStrategy, DistributedTierOptions, KeyPattern};
use mlc_providers::{
    DistributedCache, DistributedConfig, LocalCache, LocalCacheConfig, MemoryBackend,
    TokioScheduler,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

struct Harness {
    backend: Arc<MemoryBackend>,
    scheduler: TokioScheduler,
    cache: MultiLevelCache,
}

fn harness() -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let distributed = Arc::new(DistributedCache::new(
        backend.clone(),
        DistributedConfig::in_memory(),
    ));
    let local = Arc::new(LocalCache::new(LocalCacheConfig::default()));
    let scheduler = TokioScheduler::new();
    let cache = MultiLevelCache::new(
        local,
        distributed,
        Arc::new(scheduler.clone()),
        OrchestratorConfig::default(),
    );
    Harness {
        backend,
        scheduler,
        cache,
    }
}

fn counting_loader(value: Value) -> (Arc<AtomicUsize>, Loader<Value>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let loader = loader_fn(move |_key: String| {
        let counter = Arc::clone(&counter);
        let value = value.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(value)
        }
    });
    (calls, loader)
}

/// Let zero-delay deferred tasks run to completion
async fn settle(scheduler: &TokioScheduler) {
    while scheduler.pending() > 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_write_through_set_is_visible_without_loader() {
    let h = harness();
    let strategy = CacheStrategy::new();
    assert!(h.cache.set("wallet:w1:summary", &json!({"total": 10}), &strategy).await);

    let (calls, loader) = counting_loader(json!("loaded"));
    let value = h
        .cache
        .get::<Value>("wallet:w1:summary", &strategy, Some(&loader), None)
        .await;
    assert_eq!(value, Some(json!({"total": 10})));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(h.backend.exists("mlc:wallet:w1:summary").await.unwrap());
    assert!(h.cache.local().has("default", "wallet:w1:summary"));
}

#[tokio::test]
async fn test_partial_write_failure_is_not_rolled_back() {
    let h = harness();
    h.backend.set_failing(true);

    assert!(!h.cache.set("k", &1, &CacheStrategy::new()).await);
    assert!(h.cache.local().has("default", "k"));
}

#[tokio::test]
async fn test_unserializable_value_is_not_stored() {
    let h = harness();
    let mut value: HashMap<(i32, i32), i32> = HashMap::new();
    value.insert((1, 2), 3);

    assert!(!h.cache.set("bad", &value, &CacheStrategy::new()).await);
    assert!(!h.cache.exists("bad", &CacheStrategy::new()).await);
}

#[tokio::test]
async fn test_write_back_succeeds_locally_when_distributed_fails() {
    let h = harness();
    h.backend.set_failing(true);
    let strategy = CacheStrategy::new().write_back();

    assert!(h.cache.set("k", &json!("v"), &strategy).await);
    assert_eq!(
        h.cache.get::<Value>("k", &strategy, None, None).await,
        Some(json!("v"))
    );
    settle(&h.scheduler).await;
    assert_eq!(h.cache.distributed().get_stats().errors, 1);
}

#[tokio::test]
async fn test_write_back_mset_succeeds_locally_when_distributed_fails() {
    let h = harness();
    h.backend.set_failing(true);
    let strategy = CacheStrategy::new().write_back();
    let entries = vec![
        ("a".to_string(), json!(1)),
        ("b".to_string(), json!(2)),
    ];

    assert!(h.cache.mset(&entries, &strategy).await);
    let keys = vec!["a".to_string(), "b".to_string()];
    assert_eq!(
        h.cache.mget::<Value>(&keys, &strategy).await,
        vec![Some(json!(1)), Some(json!(2))]
    );
    settle(&h.scheduler).await;
    assert_eq!(h.cache.distributed().get_stats().errors, 1);
}

#[tokio::test]
async fn test_write_back_mset_pushes_batch_later() {
    let h = harness();
    let strategy = CacheStrategy::new().write_back();
    let entries = vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))];

    assert!(h.cache.mset(&entries, &strategy).await);
    settle(&h.scheduler).await;
    assert!(h.backend.exists("mlc:a").await.unwrap());
    assert!(h.backend.exists("mlc:b").await.unwrap());
}

#[tokio::test]
async fn test_write_back_mset_rejects_unserializable_values() {
    let h = harness();
    let mut value: HashMap<(i32, i32), i32> = HashMap::new();
    value.insert((1, 2), 3);
    let entries = vec![("bad".to_string(), value)];

    assert!(!h.cache.mset(&entries, &CacheStrategy::new().write_back()).await);
    assert_eq!(h.scheduler.pending(), 0);
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn test_write_back_reaches_distributed_tier_later() {
    let h = harness();
    let strategy = CacheStrategy::new().write_back();

    assert!(h.cache.set("k", &json!("v"), &strategy).await);
    settle(&h.scheduler).await;
    assert!(h.backend.exists("mlc:k").await.unwrap());
}

#[tokio::test]
async fn test_distributed_hit_backfills_local() {
    let h = harness();
    let options = DistributedTierOptions::default();
    h.cache.distributed().set("k", &json!(7), &options).await;

    let value = h
        .cache
        .get::<Value>("k", &CacheStrategy::new(), None, None)
        .await;
    assert_eq!(value, Some(json!(7)));
    assert!(h.cache.local().has("default", "k"));
}

#[tokio::test]
async fn test_rejected_local_hit_is_evicted_and_falls_through() {
    let h = harness();
    h.cache.local().set("default", "k", &json!(1), None);
    h.cache
        .distributed()
        .set("k", &json!(2), &DistributedTierOptions::default())
        .await;

    let validator = validator_fn(|value: &Value| value == &json!(2));
    let value = h
        .cache
        .get::<Value>("k", &CacheStrategy::new(), None, Some(&validator))
        .await;
    assert_eq!(value, Some(json!(2)));
    assert_eq!(h.cache.local().get::<Value>("default", "k"), Some(json!(2)));
}

#[tokio::test]
async fn test_rejected_loader_result_is_not_cached() {
    let h = harness();
    let (calls, loader) = counting_loader(json!("stale"));
    let validator = validator_fn(|value: &Value| value != &json!("stale"));

    let value = h
        .cache
        .get::<Value>("k", &CacheStrategy::new(), Some(&loader), Some(&validator))
        .await;
    assert_eq!(value, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!h.cache.exists("k", &CacheStrategy::new()).await);
}

#[tokio::test]
async fn test_miss_without_loader_returns_none() {
    let h = harness();
    assert_eq!(
        h.cache
            .get::<Value>("missing", &CacheStrategy::new(), None, None)
            .await,
        None
    );
}

#[tokio::test]
async fn test_failing_loader_returns_none() {
    let h = harness();
    let loader: Loader<Value> =
        loader_fn(|key: String| async move { Err(Error::loader(key, "upstream down")) });
    assert_eq!(
        h.cache
            .get::<Value>("k", &CacheStrategy::new(), Some(&loader), None)
            .await,
        None
    );
}

#[tokio::test(start_paused = true)]
async fn test_distributed_only_price_expires() {
    let h = harness();
    let strategy =
        CacheStrategy::distributed_only(DistributedTierOptions::new().with_ttl_secs(60));

    assert!(h.cache.set("price:ETH", &json!({"p": 3000}), &strategy).await);
    assert_eq!(
        h.cache.get::<Value>("price:ETH", &strategy, None, None).await,
        Some(json!({"p": 3000}))
    );
    assert!(!h.cache.local().has("default", "price:ETH"));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(
        h.cache.get::<Value>("price:ETH", &strategy, None, None).await,
        None
    );

    let (calls, loader) = counting_loader(json!({"p": 3100}));
    assert_eq!(
        h.cache
            .get::<Value>("price:ETH", &strategy, Some(&loader), None)
            .await,
        Some(json!({"p": 3100}))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_literal_removes_both_tiers() {
    let h = harness();
    let strategy = CacheStrategy::new();
    h.cache.set("position:p1", &json!(1), &strategy).await;

    h.cache
        .invalidate(&KeyPattern::literal("position:p1"), &strategy)
        .await
        .unwrap();
    assert_eq!(
        h.cache
            .get::<Value>("position:p1", &strategy, None, None)
            .await,
        None
    );
    assert!(!h.backend.exists("mlc:position:p1").await.unwrap());
}

#[tokio::test]
async fn test_invalidate_prefix_leaves_other_keys() {
    let h = harness();
    let strategy = CacheStrategy::new();
    for key in ["positions:walletX:a", "positions:walletX:b", "positions:walletY:a"] {
        h.cache.set(key, &json!(key), &strategy).await;
    }

    h.cache
        .invalidate(&KeyPattern::parse("positions:walletX:*"), &strategy)
        .await
        .unwrap();

    assert!(!h.cache.exists("positions:walletX:a", &strategy).await);
    assert!(!h.cache.exists("positions:walletX:b", &strategy).await);
    assert!(h.cache.exists("positions:walletY:a", &strategy).await);
    assert!(h.backend.exists("mlc:positions:walletY:a").await.unwrap());
}

#[tokio::test]
async fn test_invalidate_prefix_without_scan_errors() {
    let h = harness();
    h.backend.set_scan_supported(false);
    let strategy = CacheStrategy::new();
    h.cache.set("a:1", &1, &strategy).await;

    let result = h
        .cache
        .invalidate(&KeyPattern::prefix("a:"), &strategy)
        .await;
    assert!(result.is_err_and(|e| e.is_unsupported()));
    assert!(!h.cache.local().has("default", "a:1"));
}

#[tokio::test]
async fn test_mget_only_queries_local_misses_and_backfills() {
    let h = harness();
    let strategy = CacheStrategy::new();
    let entries = vec![
        ("a".to_string(), json!(1)),
        ("b".to_string(), json!(2)),
    ];
    assert!(h.cache.mset(&entries, &strategy).await);
    h.cache.local().delete("default", "b");

    let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let values = h.cache.mget::<Value>(&keys, &strategy).await;
    assert_eq!(values, vec![Some(json!(1)), Some(json!(2)), None]);
    assert!(h.cache.local().has("default", "b"));

    let stats = h.cache.distributed().get_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_delete_and_exists_span_tiers() {
    let h = harness();
    let strategy = CacheStrategy::new();
    h.cache
        .distributed()
        .set("only-remote", &1, &DistributedTierOptions::default())
        .await;
    assert!(h.cache.exists("only-remote", &strategy).await);

    assert!(h.cache.delete("only-remote", &strategy).await);
    assert!(!h.cache.exists("only-remote", &strategy).await);
    assert!(h.cache.delete("never-set", &strategy).await);
}

#[tokio::test]
async fn test_clear_without_pattern_empties_every_namespace() {
    let h = harness();
    h.cache
        .set("a", &1, &CacheStrategy::new().memory_namespace("prices"))
        .await;
    h.cache
        .set("b", &2, &CacheStrategy::new().memory_namespace("wallets"))
        .await;

    assert!(h.cache.clear(None, None, &CacheStrategy::new()).await);
    assert_eq!(h.cache.local().size("prices"), 0);
    assert_eq!(h.cache.local().size("wallets"), 0);
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn test_strategy_namespace_capacity_is_applied() {
    let h = harness();
    let strategy = CacheStrategy::new()
        .without_distributed()
        .with_memory(mlc_domain::value_objects::MemoryTierOptions::new("tiny").with_max_entries(2));

    for key in ["a", "b", "c"] {
        h.cache.set(key, &json!(key), &strategy).await;
    }
    assert_eq!(h.cache.local().size("tiny"), 2);
    assert!(!h.cache.local().has("tiny", "a"));
}

#[tokio::test]
async fn test_warmup_loads_only_missing_keys() {
    let h = harness();
    let strategy = CacheStrategy::new();
    h.cache.set("k1", &json!("existing"), &strategy).await;

    let (calls, loader) = counting_loader(json!("warmed"));
    let keys = vec!["k1".to_string(), "k2".to_string()];
    let report = h.cache.warmup(&keys, &loader, &strategy, Some(2)).await;

    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.cache.get::<Value>("k1", &strategy, None, None).await,
        Some(json!("existing"))
    );
    assert_eq!(
        h.cache.get::<Value>("k2", &strategy, None, None).await,
        Some(json!("warmed"))
    );
}

#[tokio::test]
async fn test_warmup_reports_failures() {
    let h = harness();
    let loader: Loader<Value> = loader_fn(|key: String| async move {
        if key == "bad" {
            Err(Error::loader(key, "not found"))
        } else {
            Ok(json!(key))
        }
    });
    let keys = vec!["good".to_string(), "bad".to_string(), "fine".to_string()];

    let report = h
        .cache
        .warmup(&keys, &loader, &CacheStrategy::new(), None)
        .await;
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].key, "bad");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_ahead_is_single_flight() {
    let h = harness();
    let strategy = CacheStrategy::new()
        .with_distributed(DistributedTierOptions::new().with_ttl_secs(100))
        .refresh_ahead();
    assert!(h.cache.set("k", &json!("old"), &strategy).await);

    tokio::time::advance(Duration::from_secs(30)).await;

    let (calls, loader) = counting_loader(json!("new"));
    let reads = (0..5).map(|_| h.cache.get::<Value>("k", &strategy, Some(&loader), None));
    for value in join_all(reads).await {
        assert_eq!(value, Some(json!("old")));
    }
    assert_eq!(h.cache.pending_refreshes(), 1);

    settle(&h.scheduler).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.cache.pending_refreshes(), 0);
    assert_eq!(
        h.cache.get::<Value>("k", &strategy, Some(&loader), None).await,
        Some(json!("new"))
    );
    settle(&h.scheduler).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Memory backend whose TTL lookups can be made to hang
#[derive(Debug, Default)]
struct SlowTtlBackend {
    inner: MemoryBackend,
    slow_ttl: AtomicBool,
}

#[async_trait::async_trait]
impl DistributedBackend for SlowTtlBackend {
    async fn ping(&self) -> mlc_domain::Result<()> {
        self.inner.ping().await
    }

    async fn get(&self, key: &str) -> mlc_domain::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> mlc_domain::Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, keys: &[String]) -> mlc_domain::Result<u64> {
        self.inner.del(keys).await
    }

    async fn exists(&self, key: &str) -> mlc_domain::Result<bool> {
        self.inner.exists(key).await
    }

    async fn mget(&self, keys: &[String]) -> mlc_domain::Result<Vec<Option<String>>> {
        self.inner.mget(keys).await
    }

    async fn mset(
        &self,
        entries: &[(String, String)],
        ttl: Option<Duration>,
    ) -> mlc_domain::Result<()> {
        self.inner.mset(entries, ttl).await
    }

    async fn scan(&self, pattern: &str) -> mlc_domain::Result<Vec<String>> {
        self.inner.scan(pattern).await
    }

    fn supports_scan(&self) -> bool {
        self.inner.supports_scan()
    }

    async fn ttl(&self, key: &str) -> mlc_domain::Result<KeyTtl> {
        if self.slow_ttl.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        self.inner.ttl(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> mlc_domain::Result<bool> {
        self.inner.expire(key, ttl).await
    }

    fn backend_name(&self) -> &str {
        "slow-ttl"
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_get_does_not_block_refresh_ahead() {
    let backend = Arc::new(SlowTtlBackend::default());
    let scheduler = TokioScheduler::new();
    let cache = MultiLevelCache::new(
        Arc::new(LocalCache::new(LocalCacheConfig::default())),
        Arc::new(DistributedCache::new(
            backend.clone(),
            DistributedConfig::in_memory(),
        )),
        Arc::new(scheduler.clone()),
        OrchestratorConfig::default(),
    );
    let strategy = CacheStrategy::new()
        .with_distributed(DistributedTierOptions::new().with_ttl_secs(100))
        .refresh_ahead();
    assert!(cache.set("k", &json!("old"), &strategy).await);
    tokio::time::advance(Duration::from_secs(50)).await;

    let (calls, loader) = counting_loader(json!("new"));
    backend.slow_ttl.store(true, Ordering::SeqCst);
    let cancelled = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get::<Value>("k", &strategy, Some(&loader), None),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(cache.pending_refreshes(), 0);

    backend.slow_ttl.store(false, Ordering::SeqCst);
    for _ in 0..3 {
        cache.get::<Value>("k", &strategy, Some(&loader), None).await;
    }
    settle(&scheduler).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.pending_refreshes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_ahead_skips_fresh_keys() {
    let h = harness();
    let strategy = CacheStrategy::new()
        .with_distributed(DistributedTierOptions::new().with_ttl_secs(100))
        .refresh_ahead();
    h.cache.set("k", &json!("v"), &strategy).await;
    tokio::time::advance(Duration::from_secs(5)).await;

    let (calls, loader) = counting_loader(json!("new"));
    h.cache.get::<Value>("k", &strategy, Some(&loader), None).await;
    settle(&h.scheduler).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_combined_stats_and_health() {
    let h = harness();
    let strategy = CacheStrategy::new();
    h.cache.set("k", &1, &strategy).await;
    h.cache.get::<i32>("k", &strategy, None, None).await;
    h.cache.get::<i32>("missing", &strategy, None, None).await;

    let stats = h.cache.get_stats(None);
    assert_eq!(stats.local.hits, 1);
    assert_eq!(stats.local.misses, 1);
    assert_eq!(stats.distributed.misses, 1);
    assert_eq!(stats.combined.hits, 1);
    assert!(h.cache.is_healthy().await);

    h.backend.set_failing(true);
    let health = h.cache.health().await;
    assert!(health.local);
    assert!(!health.distributed);
}
