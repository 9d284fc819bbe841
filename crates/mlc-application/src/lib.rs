//! Application Layer - Multi-Level Cache
//!
//! Orchestration on top of the two cache tiers provided by `mlc-providers`.
//!
//! ## Components
//!
//! - [`cache::MultiLevelCache`]: strategy-driven reads, writes, refresh-ahead
//!   and warmup across the local and distributed tiers
//! - [`invalidation::InvalidationEngine`]: rule-driven invalidation with
//!   batching, delays and dependency tracking
//!
//! ## Dependencies
//!
//! - `mlc-domain`: events, strategies, statistics and port traits
//! - `mlc-providers`: the local and distributed tier implementations

pub mod cache;
pub mod invalidation;

pub use cache::{Cacheable, MultiLevelCache, OrchestratorConfig, TierHealth};
pub use invalidation::{InvalidationConfig, InvalidationEngine, InvalidationRule};
