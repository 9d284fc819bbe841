//! Domain events

pub mod invalidation;

pub use invalidation::{EventType, InvalidationEvent, InvalidationScope, ScopeFields, WireEvent};
