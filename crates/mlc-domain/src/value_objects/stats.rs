//! Cache and invalidation statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hit ratio of `hits` over `hits + misses`, 0.0 when nothing was recorded
#[allow(clippy::cast_precision_loss)]
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total > 0 {
        hits as f64 / total as f64
    } else {
        0.0
    }
}

/// Per-namespace statistics of the local tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (expired entries included)
    pub misses: u64,
    /// Number of successful sets
    pub sets: u64,
    /// Number of explicit deletions that removed an entry
    pub deletes: u64,
    /// Entries dropped to respect capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries
    pub entries: usize,
    /// Current serialized size of all entries
    pub bytes: usize,
}

impl NamespaceStats {
    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

/// Statistics of the distributed client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributedStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (errors excluded)
    pub misses: u64,
    /// Number of successful writes
    pub sets: u64,
    /// Number of keys removed
    pub deletes: u64,
    /// Number of failed backend calls
    pub errors: u64,
    /// Moving average of compressed size over original size
    pub compression_ratio: f64,
    /// Name of the active backend
    pub backend: String,
    /// Whether the client is running on its secondary backend
    pub fallback: bool,
}

impl DistributedStats {
    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

/// Hits and misses of one tier or of both together
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

impl TierStats {
    /// Build from raw counters
    pub fn new(hits: u64, misses: u64) -> Self {
        Self {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

/// Stats answer for the monitoring surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedStats {
    /// Local tier
    pub local: TierStats,
    /// Distributed tier
    pub distributed: TierStats,
    /// Both tiers summed
    pub combined: TierStats,
}

impl CombinedStats {
    /// Combine the two tiers
    pub fn from_tiers(local: TierStats, distributed: TierStats) -> Self {
        Self {
            local,
            distributed,
            combined: TierStats::new(
                local.hits + distributed.hits,
                local.misses + distributed.misses,
            ),
        }
    }
}

/// Invalidation engine statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidationStats {
    /// Number of invalidation units executed (one per event or batch)
    pub total_invalidations: u64,
    /// Processed events per event type
    pub by_type: HashMap<String, u64>,
    /// Running average of processing time in milliseconds
    pub average_processing_ms: f64,
    /// When the last invalidation completed
    pub last_invalidation: Option<DateTime<Utc>>,
    /// Events waiting for the next drain
    pub queue_size: usize,
    /// Events parked in batch buckets
    pub pending_batched: usize,
}

/// A key warmup could not populate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupFailure {
    /// Key that failed
    pub key: String,
    /// Why it failed
    pub message: String,
}

/// Outcome of a warmup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    /// Keys present or loaded
    pub successful: usize,
    /// Keys that could not be loaded or stored
    pub failed: usize,
    /// One entry per failed key
    pub errors: Vec<WarmupFailure>,
}
