//! Invalidation engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of the invalidation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidationConfig {
    /// How long a batch bucket collects events before it is flushed
    pub batch_window_ms: u64,
    /// Period of the background drain started by `InvalidationEngine::start`
    pub drain_interval_ms: u64,
    /// Queue length above which the engine reports unhealthy
    pub max_queue_size: usize,
    /// Seconds without a successful invalidation, while events wait, before
    /// the engine reports unhealthy
    pub stale_after_secs: u64,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            batch_window_ms: 1000,
            drain_interval_ms: 5000,
            max_queue_size: 1000,
            stale_after_secs: 300,
        }
    }
}

impl InvalidationConfig {
    /// Batch window as a duration
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    /// Drain period as a duration
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }

    /// Staleness limit as a duration
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
