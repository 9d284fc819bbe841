//! Health checks and monitoring
//!
//! Aggregates per-component checks into a [`HealthReport`]. The built-in
//! checkers in [`checkers`] cover both cache tiers and the invalidation
//! engine.

use crate::logging::log_health_check;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Health status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is healthy and fully operational
    Up,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component is down and not operational
    Down,
}

impl HealthStatus {
    /// Check if the status indicates the component is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Check if the component is operational (healthy or degraded)
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Up | Self::Degraded)
    }
}

/// Individual health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Name of the health check
    pub name: String,
    /// Current status
    pub status: HealthStatus,
    /// Timestamp of last check
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
    /// Optional error message
    pub error: Option<String>,
    /// Additional details
    pub details: Option<serde_json::Value>,
}

impl HealthCheck {
    fn with_status<S: Into<String>>(name: S, status: HealthStatus, error: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            timestamp: chrono::Utc::now(),
            response_time_ms: 0,
            error,
            details: None,
        }
    }

    /// Create a successful health check
    pub fn healthy<S: Into<String>>(name: S) -> Self {
        Self::with_status(name, HealthStatus::Up, None)
    }

    /// Create a failed health check
    pub fn failed<S: Into<String>>(name: S, error: Option<String>) -> Self {
        Self::with_status(name, HealthStatus::Down, error)
    }

    /// Create a degraded health check
    pub fn degraded<S: Into<String>>(name: S, reason: Option<String>) -> Self {
        Self::with_status(name, HealthStatus::Degraded, reason)
    }

    /// Set response time
    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Overall health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst status among the checks
    pub status: HealthStatus,
    /// Timestamp of the report
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Total response time in milliseconds
    pub response_time_ms: u64,
    /// Individual health check results by name
    pub checks: BTreeMap<String, HealthCheck>,
    /// Crate version
    pub version: String,
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Up,
            timestamp: chrono::Utc::now(),
            response_time_ms: 0,
            checks: BTreeMap::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Add a health check result
    pub fn add_check(mut self, check: HealthCheck) -> Self {
        if check.status == HealthStatus::Down {
            self.status = HealthStatus::Down;
        } else if check.status == HealthStatus::Degraded && self.status == HealthStatus::Up {
            self.status = HealthStatus::Degraded;
        }

        self.checks.insert(check.name.clone(), check);
        self
    }

    /// Set response time
    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check if every component is healthy
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Health check function trait
///
/// # Example
///
/// ```no_run
/// use mlc_infrastructure::health::{HealthChecker, HealthCheck};
/// use async_trait::async_trait;
///
/// struct AlwaysUp;
///
/// #[async_trait]
/// impl HealthChecker for AlwaysUp {
///     async fn check_health(&self) -> HealthCheck {
///         HealthCheck::healthy("always-up")
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Perform a health check
    async fn check_health(&self) -> HealthCheck;
}

/// Health check registry
#[derive(Clone, Default)]
pub struct HealthRegistry {
    checkers: Arc<RwLock<BTreeMap<String, Box<dyn HealthChecker>>>>,
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRegistry").finish_non_exhaustive()
    }
}

impl HealthRegistry {
    /// Create a new health registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a health checker
    pub async fn register_checker<C>(&self, name: String, checker: C)
    where
        C: HealthChecker + 'static,
    {
        self.checkers.write().await.insert(name, Box::new(checker));
    }

    /// Unregister a health checker
    pub async fn unregister_checker(&self, name: &str) {
        self.checkers.write().await.remove(name);
    }

    /// Perform all registered health checks
    pub async fn perform_health_checks(&self) -> HealthReport {
        let start_time = Instant::now();
        let checkers = self.checkers.read().await;

        let mut report = HealthReport::new();
        for (name, checker) in checkers.iter() {
            let check = checker.check_health().await;
            log_health_check(name, check.status.is_healthy(), check.error.as_deref());
            report = report.add_check(check);
        }

        report.with_response_time(start_time.elapsed())
    }

    /// Get a list of registered health check names
    pub async fn list_checks(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }
}

/// Built-in health checkers
pub mod checkers {
    use super::{HealthCheck, HealthChecker, Instant};
    use crate::constants::{
        HEALTH_CHECK_DISTRIBUTED, HEALTH_CHECK_INVALIDATION, HEALTH_CHECK_LOCAL,
    };
    use mlc_application::invalidation::InvalidationEngine;
    use mlc_providers::{DistributedCache, LocalCache};
    use std::sync::Arc;

    /// Local tier: always up, reports namespaces and memory usage
    #[derive(Debug)]
    pub struct LocalTierChecker {
        cache: Arc<LocalCache>,
    }

    impl LocalTierChecker {
        /// Check `cache`
        pub fn new(cache: Arc<LocalCache>) -> Self {
            Self { cache }
        }
    }

    #[async_trait::async_trait]
    impl HealthChecker for LocalTierChecker {
        async fn check_health(&self) -> HealthCheck {
            HealthCheck::healthy(HEALTH_CHECK_LOCAL).with_details(serde_json::json!({
                "namespaces": self.cache.get_namespaces(),
                "memory_bytes": self.cache.get_memory_usage(),
            }))
        }
    }

    /// Distributed tier: down when the backend does not answer, degraded
    /// when running on the fallback backend
    #[derive(Debug)]
    pub struct DistributedTierChecker {
        cache: Arc<DistributedCache>,
    }

    impl DistributedTierChecker {
        /// Check `cache`
        pub fn new(cache: Arc<DistributedCache>) -> Self {
            Self { cache }
        }
    }

    #[async_trait::async_trait]
    impl HealthChecker for DistributedTierChecker {
        async fn check_health(&self) -> HealthCheck {
            let start_time = Instant::now();
            let reachable = self.cache.is_healthy().await;
            let check = if !reachable {
                HealthCheck::failed(
                    HEALTH_CHECK_DISTRIBUTED,
                    Some(format!("{} backend did not answer", self.cache.backend_name())),
                )
            } else if self.cache.is_fallback() {
                HealthCheck::degraded(
                    HEALTH_CHECK_DISTRIBUTED,
                    Some(format!(
                        "running on fallback backend {}",
                        self.cache.backend_name()
                    )),
                )
            } else {
                HealthCheck::healthy(HEALTH_CHECK_DISTRIBUTED)
            };
            let stats = self.cache.get_stats();
            check
                .with_response_time(start_time.elapsed())
                .with_details(serde_json::json!({
                    "backend": stats.backend,
                    "errors": stats.errors,
                    "hit_rate": stats.hit_rate(),
                }))
        }
    }

    /// Invalidation engine: degraded when its queue is backed up or stale
    #[derive(Debug)]
    pub struct InvalidationChecker {
        engine: InvalidationEngine,
    }

    impl InvalidationChecker {
        /// Check `engine`
        pub fn new(engine: InvalidationEngine) -> Self {
            Self { engine }
        }
    }

    #[async_trait::async_trait]
    impl HealthChecker for InvalidationChecker {
        async fn check_health(&self) -> HealthCheck {
            let stats = self.engine.get_stats();
            let check = if self.engine.is_healthy() {
                HealthCheck::healthy(HEALTH_CHECK_INVALIDATION)
            } else {
                HealthCheck::degraded(
                    HEALTH_CHECK_INVALIDATION,
                    Some(format!("{} events waiting", stats.queue_size)),
                )
            };
            check.with_details(serde_json::json!({
                "queue_size": stats.queue_size,
                "pending_batched": stats.pending_batched,
                "total_invalidations": stats.total_invalidations,
            }))
        }
    }
}
