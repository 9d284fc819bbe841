//! Cache strategy
//!
//! A [`CacheStrategy`] is passed with every orchestrator call and decides
//! which tiers take part, how writes propagate, and whether refresh-ahead is
//! active. There is no global strategy state.

use crate::constants::{LOCAL_DEFAULT_NAMESPACE, REFRESH_AHEAD_DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local tier options for a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTierOptions {
    /// Local namespace the key lives in
    pub namespace: String,
    /// Capacity applied when the namespace is created lazily
    pub max_entries: Option<usize>,
    /// TTL for entries written by this call
    pub ttl: Option<Duration>,
}

impl MemoryTierOptions {
    /// Options for a namespace, inheriting capacity and TTL from its config
    pub fn new<S: Into<String>>(namespace: S) -> Self {
        Self {
            namespace: namespace.into(),
            max_entries: None,
            ttl: None,
        }
    }

    /// Set the capacity used when the namespace does not exist yet
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Set the TTL for entries written with these options
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl Default for MemoryTierOptions {
    fn default() -> Self {
        Self::new(LOCAL_DEFAULT_NAMESPACE)
    }
}

/// Distributed tier options for a call
///
/// Every field falls back to the client configuration when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributedTierOptions {
    /// Key namespace override
    pub namespace: Option<String>,
    /// TTL override
    pub ttl: Option<Duration>,
    /// Compression override
    pub compress: Option<bool>,
}

impl DistributedTierOptions {
    /// Options that defer entirely to the client configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set TTL in seconds
    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = Some(Duration::from_secs(secs));
        self
    }

    /// Enable or disable compression
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Get the effective TTL, falling back to the given default
    pub fn effective_ttl(&self, default: Duration) -> Duration {
        self.ttl.unwrap_or(default)
    }

    /// Get the effective namespace, falling back to the given default
    pub fn effective_namespace<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

/// How a write reaches the distributed tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Write both tiers and wait for both
    #[default]
    WriteThrough,
    /// Write locally, push to the distributed tier in the background
    WriteBack,
}

/// Refresh-ahead settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefreshAhead {
    /// Remaining-TTL fraction under which a reload is scheduled
    pub threshold: f64,
}

impl Default for RefreshAhead {
    fn default() -> Self {
        Self {
            threshold: REFRESH_AHEAD_DEFAULT_THRESHOLD,
        }
    }
}

/// Per-call tier selection and write policy
///
/// ```
/// use mlc_domain::value_objects::{CacheStrategy, WritePolicy};
///
/// let strategy = CacheStrategy::new().memory_namespace("positions").write_back();
/// assert_eq!(strategy.write_policy, WritePolicy::WriteBack);
/// assert!(strategy.uses_distributed());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStrategy {
    /// Local tier, `None` disables it for the call
    pub memory: Option<MemoryTierOptions>,
    /// Distributed tier, `None` disables it for the call
    pub distributed: Option<DistributedTierOptions>,
    /// Write propagation
    #[serde(default)]
    pub write_policy: WritePolicy,
    /// Refresh-ahead, `None` disables it
    #[serde(default)]
    pub refresh_ahead: Option<RefreshAhead>,
}

impl CacheStrategy {
    /// Both tiers with default options, write-through
    pub fn new() -> Self {
        Self {
            memory: Some(MemoryTierOptions::default()),
            distributed: Some(DistributedTierOptions::default()),
            write_policy: WritePolicy::WriteThrough,
            refresh_ahead: None,
        }
    }

    /// Local tier only
    pub fn memory_only<S: Into<String>>(namespace: S) -> Self {
        Self {
            memory: Some(MemoryTierOptions::new(namespace)),
            distributed: None,
            ..Self::new()
        }
    }

    /// Distributed tier only
    pub fn distributed_only(options: DistributedTierOptions) -> Self {
        Self {
            memory: None,
            distributed: Some(options),
            ..Self::new()
        }
    }

    /// Replace the local tier options
    pub fn with_memory(mut self, memory: MemoryTierOptions) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Use a different local namespace, enabling the local tier if needed
    pub fn memory_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        let namespace = namespace.into();
        match self.memory.as_mut() {
            Some(memory) => memory.namespace = namespace,
            None => self.memory = Some(MemoryTierOptions::new(namespace)),
        }
        self
    }

    /// Replace the distributed tier options
    pub fn with_distributed(mut self, distributed: DistributedTierOptions) -> Self {
        self.distributed = Some(distributed);
        self
    }

    /// Disable the local tier
    pub fn without_memory(mut self) -> Self {
        self.memory = None;
        self
    }

    /// Disable the distributed tier
    pub fn without_distributed(mut self) -> Self {
        self.distributed = None;
        self
    }

    /// Switch to write-back
    pub fn write_back(mut self) -> Self {
        self.write_policy = WritePolicy::WriteBack;
        self
    }

    /// Switch to write-through
    pub fn write_through(mut self) -> Self {
        self.write_policy = WritePolicy::WriteThrough;
        self
    }

    /// Enable refresh-ahead with the default threshold
    pub fn refresh_ahead(mut self) -> Self {
        self.refresh_ahead = Some(RefreshAhead::default());
        self
    }

    /// Enable refresh-ahead with an explicit threshold
    pub fn with_refresh_ahead_threshold(mut self, threshold: f64) -> Self {
        self.refresh_ahead = Some(RefreshAhead { threshold });
        self
    }

    /// Whether the local tier takes part
    pub fn uses_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Whether the distributed tier takes part
    pub fn uses_distributed(&self) -> bool {
        self.distributed.is_some()
    }

    /// Whether writes to the distributed tier are deferred
    pub fn is_write_back(&self) -> bool {
        self.write_policy == WritePolicy::WriteBack
    }

    /// TTL the distributed tier applies for this strategy
    pub fn distributed_ttl(&self, default: Duration) -> Duration {
        self.distributed
            .as_ref()
            .map_or(default, |options| options.effective_ttl(default))
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        Self::new()
    }
}
