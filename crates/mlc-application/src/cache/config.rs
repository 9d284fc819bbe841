//! Orchestrator configuration

use mlc_domain::constants::{REFRESH_AHEAD_DEFAULT_THRESHOLD, WARMUP_DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};

/// Settings of the multi-level orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Keys loaded concurrently by a warmup when the call does not say
    pub warmup_concurrency: usize,
    /// Refresh-ahead threshold used by [`OrchestratorConfig::refresh_strategy`]
    pub refresh_ahead_threshold: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            warmup_concurrency: WARMUP_DEFAULT_CONCURRENCY,
            refresh_ahead_threshold: REFRESH_AHEAD_DEFAULT_THRESHOLD,
        }
    }
}

impl OrchestratorConfig {
    /// Both tiers, write-through, refresh-ahead at the configured threshold
    pub fn refresh_strategy(&self) -> mlc_domain::CacheStrategy {
        mlc_domain::CacheStrategy::new().with_refresh_ahead_threshold(self.refresh_ahead_threshold)
    }
}
