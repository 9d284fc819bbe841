//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Cache and invalidation defaults are defined in `mlc_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "mlc.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "mlc";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "MLC";

/// Separator between nested keys in environment variables (`MLC_LOCAL__DEFAULTS__MAX_ENTRIES`)
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Environment variable overriding the log filter
pub const LOG_ENV_VAR: &str = "MLC_LOG";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File name stem of rolling log files
pub const LOG_FILE_STEM: &str = "mlc";

// ============================================================================
// HEALTH CONSTANTS
// ============================================================================

/// Health check name of the local tier
pub const HEALTH_CHECK_LOCAL: &str = "local";

/// Health check name of the distributed tier
pub const HEALTH_CHECK_DISTRIBUTED: &str = "distributed";

/// Health check name of the invalidation engine
pub const HEALTH_CHECK_INVALIDATION: &str = "invalidation";

// ============================================================================
// ADMIN CONSTANTS
// ============================================================================

/// Source recorded on events submitted through the admin surface
pub const ADMIN_EVENT_SOURCE: &str = "admin";
