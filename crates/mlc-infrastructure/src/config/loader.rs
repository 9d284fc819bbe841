//! Configuration loader
//!
//! Handles loading configuration from TOML files, environment variables,
//! and default values, using Figment.

use crate::config::types::{AppConfig, LoggingConfig};
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mlc_application::cache::OrchestratorConfig;
use mlc_application::invalidation::InvalidationConfig;
use mlc_domain::error::{Error, Result};
use mlc_providers::distributed::BackendTarget;
use mlc_providers::{DistributedConfig, LocalCacheConfig, NamespaceConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Configuration sources are merged in this order (later sources override earlier):
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (if exists)
    /// 3. Environment variables with prefix, `__` between nested keys
    ///    (e.g., `MLC_DISTRIBUTED__NAMESPACE`)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            } else {
                log_config_loaded(config_path, false);
            }
        } else if let Some(default_path) = Self::find_default_config_path() {
            figment = figment.merge(Toml::file(&default_path));
            log_config_loaded(&default_path, true);
        }

        figment = figment.merge(
            Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR),
        );

        let app_config: AppConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_app_config(&app_config)?;

        Ok(app_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), toml_string).config_context("Failed to write config file")?;

        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// First existing file among the default locations
    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let candidates = vec![
            current_dir.join(DEFAULT_CONFIG_FILENAME),
            current_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME),
            dirs::config_dir()
                .map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|d| {
                    d.join(format!(".{DEFAULT_CONFIG_DIR}"))
                        .join(DEFAULT_CONFIG_FILENAME)
                })
                .unwrap_or_default(),
        ];

        candidates
            .into_iter()
            .find(|path| !path.as_os_str().is_empty() && path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate application configuration
///
/// Performs validation of every configuration section.
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_logging_config(&config.logging)?;
    validate_local_config(&config.local)?;
    validate_distributed_config(&config.distributed)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_invalidation_config(&config.invalidation)?;
    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    parse_log_level(&config.level).map(|_| ())
}

fn validate_namespace_config(name: &str, config: &NamespaceConfig) -> Result<()> {
    if config.max_entries == 0 {
        return Err(Error::configuration(format!(
            "Local namespace '{name}' max_entries cannot be 0"
        )));
    }
    if config.max_bytes == 0 {
        return Err(Error::configuration(format!(
            "Local namespace '{name}' max_bytes cannot be 0"
        )));
    }
    Ok(())
}

fn validate_local_config(config: &LocalCacheConfig) -> Result<()> {
    validate_namespace_config("defaults", &config.defaults)?;
    for (name, namespace) in &config.namespaces {
        if name.is_empty() {
            return Err(Error::configuration("Local namespace name cannot be empty"));
        }
        validate_namespace_config(name, namespace)?;
    }
    Ok(())
}

fn validate_backend_target(role: &str, target: &BackendTarget) -> Result<()> {
    if let BackendTarget::Redis { url } = target {
        let supported = ["redis://", "rediss://", "redis+unix://", "unix://"];
        if !supported.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(Error::configuration(format!(
                "Distributed {role} backend URL must use a redis:// or rediss:// scheme"
            )));
        }
    }
    Ok(())
}

fn validate_distributed_config(config: &DistributedConfig) -> Result<()> {
    if config.namespace.is_empty() {
        return Err(Error::configuration(
            "Distributed namespace cannot be empty",
        ));
    }
    if config.connect_timeout_ms == 0 {
        return Err(Error::configuration(
            "Distributed connect timeout cannot be 0",
        ));
    }
    validate_backend_target("primary", &config.primary)?;
    validate_backend_target("fallback", &config.fallback)?;
    Ok(())
}

fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<()> {
    if config.warmup_concurrency == 0 {
        return Err(Error::configuration("Warmup concurrency cannot be 0"));
    }
    if !(config.refresh_ahead_threshold > 0.0 && config.refresh_ahead_threshold <= 1.0) {
        return Err(Error::configuration(
            "Refresh-ahead threshold must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_invalidation_config(config: &InvalidationConfig) -> Result<()> {
    if config.max_queue_size == 0 {
        return Err(Error::configuration(
            "Invalidation max queue size cannot be 0",
        ));
    }
    if config.drain_interval_ms == 0 {
        return Err(Error::configuration(
            "Invalidation drain interval cannot be 0",
        ));
    }
    Ok(())
}

/// Configuration builder for programmatic configuration
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Set logging configuration
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Set local tier configuration
    pub fn with_local(mut self, local: LocalCacheConfig) -> Self {
        self.config.local = local;
        self
    }

    /// Add bounds for one local namespace
    pub fn with_namespace<S: Into<String>>(mut self, name: S, namespace: NamespaceConfig) -> Self {
        self.config.local.namespaces.insert(name.into(), namespace);
        self
    }

    /// Set distributed tier configuration
    pub fn with_distributed(mut self, distributed: DistributedConfig) -> Self {
        self.config.distributed = distributed;
        self
    }

    /// Set orchestrator configuration
    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.config.orchestrator = orchestrator;
        self
    }

    /// Set invalidation engine configuration
    pub fn with_invalidation(mut self, invalidation: InvalidationConfig) -> Self {
        self.config.invalidation = invalidation;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
