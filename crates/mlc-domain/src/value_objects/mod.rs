//! Value objects shared across layers

pub mod key_pattern;
pub mod stats;
pub mod strategy;

pub use key_pattern::{KeyPattern, escape_glob};
pub use stats::{
    CombinedStats, DistributedStats, InvalidationStats, NamespaceStats, TierStats, WarmupFailure,
    WarmupReport, hit_rate,
};
pub use strategy::{
    CacheStrategy, DistributedTierOptions, MemoryTierOptions, RefreshAhead, WritePolicy,
};
