//! Event-driven cache invalidation
//!
//! [`InvalidationEngine`] queues [`InvalidationEvent`](mlc_domain::InvalidationEvent)s,
//! matches them against [`InvalidationRule`]s and invalidates the resulting
//! key patterns with batching, delays and dependency tracking.

mod config;
pub mod defaults;
mod engine;
mod rule;

pub use config::InvalidationConfig;
pub use defaults::default_rules;
pub use engine::{DEPENDENCY_SOURCE, InvalidationEngine};
pub use rule::{InvalidationRule, KeyGenerator, RuleMatcher};
