//! Distributed Backend Port
//!
//! Port for the remote key-value store behind the distributed tier. Keys
//! reaching a backend are already namespaced and values are already encoded;
//! backends move strings and nothing else.
//!
//! ## Implementations
//!
//! - **Redis**: production backend
//! - **Memory**: in-process backend used as startup fallback and in tests

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Remaining lifetime of a stored key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists without expiry
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Translate Redis `TTL`/`PTTL` style codes (-2 missing, -1 persistent)
    pub fn from_millis_code(code: i64) -> Self {
        match code {
            -2 => Self::Missing,
            code if code < 0 => Self::Persistent,
            millis => Self::Expires(Duration::from_millis(millis.unsigned_abs())),
        }
    }

    /// Remaining duration, if the key expires
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Expires(remaining) => Some(*remaining),
            Self::Missing | Self::Persistent => None,
        }
    }
}

/// Distributed Backend Port
///
/// Every method reports transport failures as [`crate::error::Error::Connection`];
/// the distributed client turns them into misses.
#[async_trait]
pub trait DistributedBackend: Send + Sync + std::fmt::Debug {
    /// Round-trip check used at startup and by health checks
    async fn ping(&self) -> Result<()>;

    /// Get a raw value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw value, with expiry when `ttl` is set
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete keys, returning how many existed
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Get several raw values, positionally aligned with `keys`
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Store several raw values sharing one expiry
    async fn mset(&self, entries: &[(String, String)], ttl: Option<Duration>) -> Result<()>;

    /// Keys matching a glob pattern
    ///
    /// Backends that cannot scan return [`crate::error::Error::Unsupported`].
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Whether [`DistributedBackend::scan`] is available
    fn supports_scan(&self) -> bool;

    /// Remaining lifetime of a key
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Reset the expiry of an existing key, `false` if it does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Get the name/identifier of this backend implementation
    fn backend_name(&self) -> &str;
}
