//! # Multi-Level Cache - Domain Layer
//!
//! Core types shared by every layer of the cache: the error type, the ports
//! implemented by backends and schedulers, strategies, key patterns,
//! invalidation events and statistics.
//!
//! This crate has no runtime dependencies on tokio or any backend client.

pub mod constants;
pub mod error;
pub mod events;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
pub use events::{EventType, InvalidationEvent, InvalidationScope};
pub use value_objects::{CacheStrategy, KeyPattern, WritePolicy};
