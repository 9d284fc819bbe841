//! Application context tests

use mlc_domain::value_objects::CacheStrategy;
use mlc_infrastructure::config::{AppConfig, ConfigBuilder};
use mlc_infrastructure::constants::{
    HEALTH_CHECK_DISTRIBUTED, HEALTH_CHECK_INVALIDATION, HEALTH_CHECK_LOCAL,
};
use mlc_infrastructure::context::AppContext;
use mlc_infrastructure::health::HealthStatus;
use mlc_providers::distributed::BackendTarget;
use mlc_providers::{DistributedConfig, NamespaceConfig};
use serde_json::{Value, json};

fn in_memory_config() -> AppConfig {
    ConfigBuilder::new()
        .with_distributed(DistributedConfig::in_memory())
        .build()
}

#[tokio::test]
async fn test_bootstrap_wires_every_component() {
    let context = AppContext::bootstrap(in_memory_config()).await.unwrap();

    assert_eq!(context.distributed().backend_name(), "memory");
    assert!(!context.distributed().is_fallback());
    assert_eq!(context.engine().rules().len(), 7);

    let strategy = CacheStrategy::new();
    assert!(context.cache().set("price:ETH", &json!(3000), &strategy).await);
    let cached: Option<Value> = context.cache().get("price:ETH", &strategy, None, None).await;
    assert_eq!(cached, Some(json!(3000)));
}

#[tokio::test]
async fn test_bootstrap_rejects_invalid_config() {
    let config = ConfigBuilder::new()
        .with_distributed(DistributedConfig {
            namespace: String::new(),
            ..DistributedConfig::in_memory()
        })
        .build();
    assert!(AppContext::bootstrap(config).await.is_err());
}

#[tokio::test]
async fn test_bootstrap_applies_namespace_bounds() {
    let config = ConfigBuilder::new()
        .with_distributed(DistributedConfig::in_memory())
        .with_namespace("prices", NamespaceConfig::default().with_max_entries(2))
        .build();
    let context = AppContext::bootstrap(config).await.unwrap();

    for token in ["ETH", "BTC", "SOL"] {
        assert!(context.local().set("prices", &format!("price:{token}"), &1, None));
    }
    assert_eq!(context.local().size("prices"), 2);
}

#[tokio::test]
async fn test_two_contexts_are_independent() {
    let first = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let second = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let strategy = CacheStrategy::new();

    assert!(first.cache().set("wallet:w1:summary", &json!(1), &strategy).await);
    assert!(first.cache().exists("wallet:w1:summary", &strategy).await);
    assert!(!second.cache().exists("wallet:w1:summary", &strategy).await);
}

#[tokio::test]
async fn test_stats_report_covers_every_component() {
    let context = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let strategy = CacheStrategy::new();
    context.cache().set("price:ETH", &json!(3000), &strategy).await;
    let _: Option<Value> = context.cache().get("price:ETH", &strategy, None, None).await;
    let _: Option<Value> = context.cache().get("price:BTC", &strategy, None, None).await;

    let report = context.stats(None);
    let default_ns = &report.local["default"];
    assert_eq!(default_ns.hits, 1);
    assert_eq!(default_ns.misses, 1);
    assert_eq!(report.invalidation.total_invalidations, 0);
    assert_eq!(report.distributed.backend, "memory");

    let scoped = context.stats(Some("missing"));
    assert!(scoped.local.is_empty());

    let encoded = serde_json::to_value(&report).unwrap();
    assert!(encoded.get("invalidation").is_some());
}

#[tokio::test]
async fn test_health_of_in_memory_context() {
    let context = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let report = context.health().await;

    assert_eq!(report.status, HealthStatus::Up);
    for name in [HEALTH_CHECK_LOCAL, HEALTH_CHECK_DISTRIBUTED, HEALTH_CHECK_INVALIDATION] {
        assert!(report.checks.contains_key(name), "missing check {name}");
    }
    assert!(context.is_healthy().await);
}

#[tokio::test]
async fn test_offline_context_reports_down() {
    let config = ConfigBuilder::new()
        .with_distributed(DistributedConfig {
            primary: BackendTarget::Disabled,
            fallback: BackendTarget::Disabled,
            ..DistributedConfig::default()
        })
        .build();
    let context = AppContext::bootstrap(config).await.unwrap();

    let report = context.health().await;
    assert_eq!(report.status, HealthStatus::Down);
    assert_eq!(report.checks[HEALTH_CHECK_DISTRIBUTED].status, HealthStatus::Down);
    assert!(!context.is_healthy().await);
}

#[tokio::test(start_paused = true)]
async fn test_start_drains_queue_periodically() {
    let context = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let strategy = CacheStrategy::new();
    context.cache().set("position:p1", &json!({"size": 1}), &strategy).await;
    context.start();

    let admin = mlc_infrastructure::AdminCommand::parse(
        r#"{"action": "invalidate_cache", "type": "manual", "scope": {"keys": ["position:p1"]}}"#,
    )
    .unwrap();
    mlc_infrastructure::admin::dispatch(&context, admin).await.unwrap();

    let interval = context.config().invalidation.drain_interval();
    tokio::time::sleep(interval * 2).await;

    assert_eq!(context.engine().queue_size(), 0);
    assert!(!context.cache().exists("position:p1", &strategy).await);
    context.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_flushes_open_batches() {
    let context = AppContext::bootstrap(in_memory_config()).await.unwrap();
    let strategy = CacheStrategy::new();
    context.cache().set("positions:ethereum:w1", &json!(1), &strategy).await;

    let admin = mlc_infrastructure::AdminCommand::parse(
        r#"{"action": "invalidate_cache", "type": "chain_update", "scope": {"chain": "ethereum"}}"#,
    )
    .unwrap();
    mlc_infrastructure::admin::dispatch(&context, admin).await.unwrap();

    context.shutdown().await;

    assert_eq!(context.engine().queue_size(), 0);
    assert_eq!(context.engine().pending_batched(), 0);
    assert!(!context.cache().exists("positions:ethereum:w1", &strategy).await);
    assert_eq!(context.scheduler().pending(), 0);
}
