//! Domain ports
//!
//! Interfaces the outer layers implement or call through.

pub mod backend;
pub mod loader;
pub mod scheduler;

pub use backend::{DistributedBackend, KeyTtl};
pub use loader::{Loader, Validator, loader_fn, validator_fn};
pub use scheduler::{DeferredTask, ScheduledTask, TaskHandle, TaskScheduler};
