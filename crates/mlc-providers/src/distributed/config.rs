//! Distributed tier configuration

use mlc_domain::constants::{
    COMPRESSION_DEFAULT_THRESHOLD, DISTRIBUTED_DEFAULT_NAMESPACE, DISTRIBUTED_DEFAULT_TTL_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the distributed tier stores its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendTarget {
    /// A Redis server
    Redis {
        /// Connection URL, e.g. `redis://localhost:6379`
        url: String,
    },
    /// In-process storage, not shared between instances
    Memory,
    /// No backend; every call is a miss
    Disabled,
}

impl BackendTarget {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Redis { .. } => "redis",
            Self::Memory => "memory",
            Self::Disabled => "disabled",
        }
    }
}

/// Distributed tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedConfig {
    /// Key namespace used when a call does not override it
    pub namespace: String,
    /// TTL in seconds used when a call does not override it (0 disables expiry)
    pub default_ttl_secs: u64,
    /// Compress values unless a call overrides it
    pub compression: bool,
    /// Payloads below this size are never compressed
    pub compression_threshold: usize,
    /// Backend tried first at startup
    pub primary: BackendTarget,
    /// Backend used when the primary is unreachable at startup
    pub fallback: BackendTarget,
    /// Connection and ping timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            namespace: DISTRIBUTED_DEFAULT_NAMESPACE.to_string(),
            default_ttl_secs: DISTRIBUTED_DEFAULT_TTL_SECS,
            compression: false,
            compression_threshold: COMPRESSION_DEFAULT_THRESHOLD,
            primary: BackendTarget::Redis {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            fallback: BackendTarget::Memory,
            connect_timeout_ms: 2000,
        }
    }
}

impl DistributedConfig {
    /// In-memory configuration, used by tests and single-instance setups
    pub fn in_memory() -> Self {
        Self {
            primary: BackendTarget::Memory,
            fallback: BackendTarget::Disabled,
            ..Self::default()
        }
    }

    /// Default TTL as a [`Duration`]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Connection timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
