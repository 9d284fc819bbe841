//! Distributed tier
//!
//! ## Available Backends
//!
//! | Backend | Type | Description |
//! |---------|------|-------------|
//! | [`RedisBackend`] | Distributed | Redis, shared by every instance |
//! | [`MemoryBackend`] | Local | In-process fallback and test double |
//! | [`OfflineBackend`] | Disabled | Every call is a miss |
//!
//! [`DistributedCache`] sits on top of whichever backend was selected at
//! startup and is the only type the orchestrator talks to.

mod client;
pub mod compression;
mod config;
mod memory;
mod offline;
#[cfg(feature = "cache-redis")]
mod redis;

pub use client::DistributedCache;
pub use config::{BackendTarget, DistributedConfig};
pub use memory::MemoryBackend;
pub use offline::OfflineBackend;
#[cfg(feature = "cache-redis")]
pub use self::redis::RedisBackend;
