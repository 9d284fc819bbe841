//! Domain constants
//!
//! Defaults shared by every layer. Infrastructure-only constants live in
//! `mlc_infrastructure::constants`.

// ============================================================================
// LOCAL TIER
// ============================================================================

/// Default maximum number of entries per local namespace
pub const LOCAL_DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default maximum serialized bytes per local namespace (50MB)
pub const LOCAL_DEFAULT_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Default local TTL in seconds (5 minutes)
pub const LOCAL_DEFAULT_TTL_SECS: u64 = 300;

/// Default local namespace
pub const LOCAL_DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// DISTRIBUTED TIER
// ============================================================================

/// Default distributed TTL in seconds (1 hour)
pub const DISTRIBUTED_DEFAULT_TTL_SECS: u64 = 3600;

/// Default distributed key namespace
pub const DISTRIBUTED_DEFAULT_NAMESPACE: &str = "mlc";

/// Separator between namespace and key in the distributed tier
pub const NAMESPACE_SEPARATOR: &str = ":";

/// Payloads smaller than this are never compressed
pub const COMPRESSION_DEFAULT_THRESHOLD: usize = 1024;

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Remaining-TTL fraction under which refresh-ahead schedules a reload
pub const REFRESH_AHEAD_DEFAULT_THRESHOLD: f64 = 0.8;

/// Default number of keys loaded concurrently during warmup
pub const WARMUP_DEFAULT_CONCURRENCY: usize = 10;

// ============================================================================
// INVALIDATION
// ============================================================================

/// Scope bucket used for batching events that carry no chain
pub const GLOBAL_SCOPE: &str = "global";

/// Delay applied to price-change invalidations (milliseconds)
pub const PRICE_CHANGE_DELAY_MS: u64 = 5000;

/// Maximum number of failed keys included in a log line
pub const FAILED_KEYS_LOG_SAMPLE: usize = 10;
