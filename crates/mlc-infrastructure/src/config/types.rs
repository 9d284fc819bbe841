//! Configuration types

use crate::constants::DEFAULT_LOG_LEVEL;
use mlc_application::cache::OrchestratorConfig;
use mlc_application::invalidation::InvalidationConfig;
use mlc_providers::{DistributedConfig, LocalCacheConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON output format
    pub json_format: bool,

    /// Log to a daily-rolling file in addition to stdout
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json_format: false,
            file_output: None,
        }
    }
}

/// Main application configuration
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [local.defaults]
/// max_entries = 5000
///
/// [local.namespaces.prices]
/// max_entries = 200
/// ttl_secs = 30
///
/// [distributed]
/// namespace = "defi"
/// primary = { kind = "redis", url = "redis://cache:6379" }
///
/// [invalidation]
/// batch_window_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging
    pub logging: LoggingConfig,

    /// Local tier bounds
    pub local: LocalCacheConfig,

    /// Distributed tier backend and defaults
    pub distributed: DistributedConfig,

    /// Orchestrator defaults
    pub orchestrator: OrchestratorConfig,

    /// Invalidation engine timing and limits
    pub invalidation: InvalidationConfig,
}
