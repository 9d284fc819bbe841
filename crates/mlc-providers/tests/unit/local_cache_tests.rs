//! Tests for the local bounded cache

use mlc_domain::value_objects::KeyPattern;
use mlc_providers::local::{LocalCache, LocalCacheConfig, NamespaceConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Position {
    wallet: String,
    amount: u64,
}

fn bounded(max_entries: usize) -> LocalCache {
    LocalCache::new(LocalCacheConfig {
        defaults: NamespaceConfig::default().with_max_entries(max_entries),
        ..LocalCacheConfig::default()
    })
}

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let cache = LocalCache::default();
    let position = Position {
        wallet: "0xabc".to_string(),
        amount: 42,
    };

    assert!(cache.set("positions", "position:1", &position, None));
    assert_eq!(cache.get::<Position>("positions", "position:1"), Some(position));
    assert!(cache.has("positions", "position:1"));
    assert_eq!(cache.size("positions"), 1);
}

#[tokio::test]
async fn test_capacity_is_never_exceeded() {
    let cache = bounded(5);
    for i in 0..50 {
        cache.set("ns", &format!("k{i}"), &i, None);
        assert!(cache.size("ns") <= 5);
    }
    let stats = cache.get_stats("ns").unwrap();
    assert_eq!(stats.entries, 5);
    assert_eq!(stats.evictions, 45);
}

#[tokio::test]
async fn test_first_inserted_key_is_evicted_first() {
    let cache = bounded(3);
    for key in ["a", "b", "c", "d"] {
        cache.set("ns", key, &key, None);
    }
    assert!(!cache.has("ns", "a"));
    for key in ["b", "c", "d"] {
        assert!(cache.has("ns", key));
    }
}

#[tokio::test]
async fn test_get_refreshes_recency() {
    let cache = bounded(3);
    for key in ["a", "b", "c"] {
        cache.set("ns", key, &key, None);
    }
    assert_eq!(cache.get::<String>("ns", "a").as_deref(), Some("a"));
    cache.set("ns", "d", &"d", None);

    assert!(cache.has("ns", "a"));
    assert!(!cache.has("ns", "b"));
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_by_ttl() {
    let cache = LocalCache::default();
    cache.set("ns", "short", &1, Some(Duration::from_secs(10)));
    cache.set("ns", "long", &2, Some(Duration::from_secs(100)));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.get::<i32>("ns", "short"), None);
    assert_eq!(cache.get::<i32>("ns", "long"), Some(2));
    assert_eq!(cache.get_stats("ns").unwrap().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_prune_drops_expired_entries() {
    let cache = LocalCache::default();
    for i in 0..4 {
        cache.set("a", &format!("k{i}"), &i, Some(Duration::from_secs(5)));
    }
    cache.set("b", "keep", &0, Some(Duration::from_secs(60)));

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(cache.prune(), 4);
    assert_eq!(cache.size("a"), 0);
    assert_eq!(cache.size("b"), 1);
}

#[tokio::test]
async fn test_unserializable_value_is_rejected() {
    use std::collections::HashMap;

    // JSON object keys must be strings
    let mut value = HashMap::new();
    value.insert(vec![1u8], 1);

    let cache = LocalCache::default();
    assert!(!cache.set("ns", "bad", &value, None));
    assert!(!cache.has("ns", "bad"));
}

#[tokio::test]
async fn test_oversized_value_is_rejected_without_flushing() {
    let cache = LocalCache::new(LocalCacheConfig {
        defaults: NamespaceConfig::default().with_max_bytes(64),
        ..LocalCacheConfig::default()
    });
    assert!(cache.set("ns", "small", &1, None));
    assert!(!cache.set("ns", "big", &"x".repeat(100), None));
    assert!(cache.has("ns", "small"));
}

#[tokio::test]
async fn test_byte_budget_evicts_least_recent() {
    let cache = LocalCache::new(LocalCacheConfig {
        defaults: NamespaceConfig::default().with_max_bytes(30),
        ..LocalCacheConfig::default()
    });
    // 13 bytes per entry: one-char key plus the quoted string
    cache.set("ns", "a", &"0123456789", None);
    cache.set("ns", "b", &"0123456789", None);
    cache.set("ns", "c", &"0123456789", None);

    assert!(!cache.has("ns", "a"));
    assert!(cache.has("ns", "c"));
    assert_eq!(cache.get_memory_usage(), 26);
}

#[tokio::test]
async fn test_stats_and_hit_rate() {
    let cache = LocalCache::default();
    cache.set("ns", "k", &1, None);
    let _ = cache.get::<i32>("ns", "k");
    let _ = cache.get::<i32>("ns", "k");
    let _ = cache.get::<i32>("ns", "missing");
    assert!(cache.delete("ns", "k"));

    let stats = cache.get_stats("ns").unwrap();
    assert_eq!((stats.hits, stats.misses, stats.sets, stats.deletes), (2, 1, 1, 1));
    assert!((cache.get_hit_rate(Some("ns")) - 2.0 / 3.0).abs() < 1e-9);

    cache.reset_stats(None);
    assert_eq!(cache.get_stats("ns").unwrap().hits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_introspection() {
    let cache = LocalCache::default();
    cache.set("ns", "first", &1, None);
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.set("ns", "second", &2, None);
    for _ in 0..3 {
        let _ = cache.get::<i32>("ns", "second");
    }

    let most = cache.get_most_accessed("ns", 1);
    assert_eq!(most[0].0, "second");
    assert_eq!(most[0].1.access_count, 3);

    let oldest = cache.get_oldest("ns", 1);
    assert_eq!(oldest[0].0, "first");

    let mut keys = cache.keys("ns");
    keys.sort();
    assert_eq!(keys, vec!["first", "second"]);
    assert_eq!(cache.values("ns").len(), 2);
    assert_eq!(cache.entries("ns")[0].0, "second");
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let cache = LocalCache::new(
        LocalCacheConfig::default()
            .with_namespace("tiny", NamespaceConfig::default().with_max_entries(1)),
    );
    cache.set("tiny", "a", &1, None);
    cache.set("tiny", "b", &2, None);
    cache.set("wide", "a", &1, None);
    cache.set("wide", "b", &2, None);

    assert_eq!(cache.size("tiny"), 1);
    assert_eq!(cache.size("wide"), 2);
    assert_eq!(cache.get_namespaces(), vec!["tiny", "wide"]);

    assert!(cache.delete_namespace("tiny"));
    assert_eq!(cache.get_namespaces(), vec!["wide"]);
}

#[tokio::test]
async fn test_delete_matching_prefix() {
    let cache = LocalCache::default();
    for key in ["positions:walletX:1", "positions:walletX:2", "positions:walletY:1"] {
        cache.set("a", key, &1, None);
        cache.set("b", key, &1, None);
    }

    let removed = cache.delete_matching(None, &KeyPattern::parse("positions:walletX:*"));
    assert_eq!(removed, 4);
    assert_eq!(cache.keys("a"), vec!["positions:walletY:1"]);

    assert_eq!(cache.delete_matching(Some("b"), &KeyPattern::all()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pruner_runs_periodically() {
    let cache = std::sync::Arc::new(LocalCache::default());
    cache.set("ns", "k", &1, Some(Duration::from_secs(1)));
    let handle = cache.start_pruner(Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(cache.get_stats("ns").unwrap().expirations, 1);
    handle.abort();
}
