//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns that support the application and domain layers.
//!
//! ## Module Categories
//!
//! ### Configuration & Bootstrap
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-layered TOML and environment configuration |
//! | [`context`] | Explicitly constructed owner of every cache component |
//! | [`constants`] | Centralized configuration constants |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`health`] | Health checks for both tiers and the invalidation engine |
//! | [`logging`] | Structured logging with tracing |
//!
//! ### Operations
//! | Module | Description |
//! |--------|-------------|
//! | [`admin`] | `clear_cache` / `invalidate_cache` command dispatch |

pub mod admin;
pub mod config;
pub mod constants;
pub mod context;
pub mod error_ext;
pub mod health;
pub mod logging;

// Re-export commonly used types
pub use admin::{AdminCommand, AdminOutcome};
pub use config::{AppConfig, ConfigBuilder, ConfigLoader};
pub use context::{AppContext, StatsReport};
pub use error_ext::ErrorContext;
