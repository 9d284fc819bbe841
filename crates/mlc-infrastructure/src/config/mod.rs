//! Configuration
//!
//! Layered loading of [`AppConfig`]: defaults, then a TOML file, then
//! `MLC_*` environment variables.

pub mod loader;
pub mod types;

pub use loader::{ConfigBuilder, ConfigLoader, validate_app_config};
pub use types::{AppConfig, LoggingConfig};
