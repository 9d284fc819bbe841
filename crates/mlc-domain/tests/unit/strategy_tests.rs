//! Cache strategy tests

use mlc_domain::constants::{LOCAL_DEFAULT_NAMESPACE, REFRESH_AHEAD_DEFAULT_THRESHOLD};
use mlc_domain::value_objects::{CacheStrategy, DistributedTierOptions, WritePolicy};
use std::time::Duration;

#[test]
fn test_default_strategy_uses_both_tiers() {
    let strategy = CacheStrategy::default();
    assert!(strategy.uses_memory());
    assert!(strategy.uses_distributed());
    assert_eq!(strategy.write_policy, WritePolicy::WriteThrough);
    assert!(strategy.refresh_ahead.is_none());
    assert_eq!(
        strategy.memory.as_ref().map(|memory| memory.namespace.as_str()),
        Some(LOCAL_DEFAULT_NAMESPACE)
    );
}

#[test]
fn test_single_tier_strategies() {
    let memory = CacheStrategy::memory_only("prices");
    assert!(!memory.uses_distributed());
    assert_eq!(memory.memory.unwrap().namespace, "prices");

    let distributed = CacheStrategy::distributed_only(DistributedTierOptions::new().with_ttl_secs(30));
    assert!(!distributed.uses_memory());
    assert_eq!(
        distributed.distributed_ttl(Duration::from_secs(3600)),
        Duration::from_secs(30)
    );
}

#[test]
fn test_builder_switches() {
    let strategy = CacheStrategy::new()
        .without_distributed()
        .memory_namespace("wallets")
        .write_back()
        .refresh_ahead();

    assert!(strategy.is_write_back());
    assert_eq!(strategy.memory.as_ref().unwrap().namespace, "wallets");
    assert_eq!(
        strategy.refresh_ahead.map(|refresh| refresh.threshold),
        Some(REFRESH_AHEAD_DEFAULT_THRESHOLD)
    );
    assert_eq!(
        strategy.distributed_ttl(Duration::from_secs(60)),
        Duration::from_secs(60)
    );
}

#[test]
fn test_distributed_options_fall_back_to_defaults() {
    let options = DistributedTierOptions::new();
    assert_eq!(options.effective_namespace("mlc"), "mlc");
    assert_eq!(
        options.with_namespace("defi").effective_namespace("mlc"),
        "defi"
    );
}
