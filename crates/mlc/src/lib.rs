//! # Multi-Level Cache
//!
//! A bounded in-process LRU tier in front of a shared key-value tier, with a
//! rule-driven invalidation engine on top.
//!
//! ```no_run
//! use mlc::infrastructure::{AppContext, ConfigLoader};
//! use mlc::CacheStrategy;
//! use serde_json::json;
//!
//! # async fn run() -> mlc::Result<()> {
//! let config = ConfigLoader::new().load()?;
//! let context = AppContext::bootstrap(config).await?;
//! context.start();
//!
//! let strategy = CacheStrategy::new();
//! context.cache().set("price:ETH", &json!(3000.5), &strategy).await;
//! let price: Option<serde_json::Value> = context.cache().get("price:ETH", &strategy, None, None).await;
//! # let _ = price;
//!
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod domain {
    pub use mlc_domain::*;
}

pub mod application {
    pub use mlc_application::*;
}

pub mod providers {
    pub use mlc_providers::*;
}

pub mod infrastructure {
    pub use mlc_infrastructure::*;
}

pub use domain::*;

pub use application::{InvalidationEngine, InvalidationRule, MultiLevelCache};

pub use infrastructure::{AppConfig, AppContext};
