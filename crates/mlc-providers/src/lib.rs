//! # Multi-Level Cache - Providers
//!
//! Implementations of the two cache tiers and of the task scheduler port:
//!
//! - [`local`]: namespace-partitioned LRU store with TTL expiry
//! - [`distributed`]: client and backends for the remote key-value tier
//! - [`scheduler`]: tokio-backed deferred task execution

pub mod distributed;
pub mod local;
pub mod scheduler;

pub use distributed::{DistributedCache, DistributedConfig, MemoryBackend};
pub use local::{LocalCache, LocalCacheConfig, NamespaceConfig};
pub use scheduler::TokioScheduler;
