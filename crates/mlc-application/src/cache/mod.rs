//! Multi-level cache orchestration

mod config;
mod multi_level;

pub use config::OrchestratorConfig;
pub use multi_level::{Cacheable, MultiLevelCache, TierHealth};
