//! Invalidation rules
//!
//! A rule answers two questions about an event: does it apply, and which
//! key patterns does it invalidate. Both callbacks may fail; a failing rule
//! is skipped without affecting the others.

use mlc_domain::error::{Error, Result};
use mlc_domain::events::{EventType, InvalidationEvent};
use mlc_domain::value_objects::{CacheStrategy, KeyPattern};
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a rule applies to an event of its type
pub type RuleMatcher = Arc<dyn Fn(&InvalidationEvent) -> Result<bool> + Send + Sync>;

/// Produces the key patterns an event invalidates
pub type KeyGenerator = Arc<dyn Fn(&InvalidationEvent) -> Result<Vec<KeyPattern>> + Send + Sync>;

/// Maps events of one type to key patterns
///
/// ```
/// use mlc_application::invalidation::InvalidationRule;
/// use mlc_domain::events::EventType;
/// use mlc_domain::value_objects::KeyPattern;
///
/// let rule = InvalidationRule::new("analytics", EventType::ChainUpdate, |_event| {
///     Ok(vec![KeyPattern::prefix("analytics:")])
/// })
/// .batched();
/// assert!(rule.is_batched());
/// ```
#[derive(Clone)]
pub struct InvalidationRule {
    name: String,
    event_type: EventType,
    matcher: Option<RuleMatcher>,
    keys: KeyGenerator,
    strategy: Option<CacheStrategy>,
    delay: Option<Duration>,
    batch: bool,
}

impl InvalidationRule {
    /// Create a rule applying to every event of `event_type`
    pub fn new<N, F>(name: N, event_type: EventType, keys: F) -> Self
    where
        N: Into<String>,
        F: Fn(&InvalidationEvent) -> Result<Vec<KeyPattern>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            event_type,
            matcher: None,
            keys: Arc::new(keys),
            strategy: None,
            delay: None,
            batch: false,
        }
    }

    /// Narrow the rule with an extra predicate
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&InvalidationEvent) -> Result<bool> + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Invalidate under this strategy instead of the engine default
    pub fn with_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Wait before invalidating
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Coalesce matching events inside the batch window
    pub fn batched(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Rule name, unique within an engine
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event type the rule listens to
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Strategy override
    pub fn strategy(&self) -> Option<&CacheStrategy> {
        self.strategy.as_ref()
    }

    /// Delay before invalidation
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Whether matching events are batched
    pub fn is_batched(&self) -> bool {
        self.batch
    }

    /// Whether the rule applies to `event`
    pub fn matches(&self, event: &InvalidationEvent) -> Result<bool> {
        if event.event_type() != self.event_type {
            return Ok(false);
        }
        match &self.matcher {
            Some(matcher) => {
                matcher(event).map_err(|e| Error::invalidation_rule(&self.name, e.to_string()))
            }
            None => Ok(true),
        }
    }

    /// Key patterns `event` invalidates under this rule
    pub fn keys_for(&self, event: &InvalidationEvent) -> Result<Vec<KeyPattern>> {
        (self.keys)(event).map_err(|e| Error::invalidation_rule(&self.name, e.to_string()))
    }
}

impl std::fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationRule")
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("has_matcher", &self.matcher.is_some())
            .field("strategy", &self.strategy)
            .field("delay", &self.delay)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
