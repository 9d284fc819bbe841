//! Invalidation Engine
//!
//! Turns [`InvalidationEvent`]s into key invalidations on a
//! [`MultiLevelCache`]. Events are queued synchronously and drained by a
//! single worker at a time. Each event is matched against the registered
//! rules; the union of their patterns is then executed immediately, after a
//! delay, or folded into a batch bucket keyed by `(event type, chain)`.
//!
//! Keys registered as dependents of an invalidated prerequisite are
//! invalidated through a follow-up `dependency_change` event. Follow-ups
//! never fan out again, so dependency cycles terminate.

use super::config::InvalidationConfig;
use super::rule::InvalidationRule;
use crate::cache::MultiLevelCache;
use chrono::{DateTime, Utc};
use mlc_domain::constants::FAILED_KEYS_LOG_SAMPLE;
use mlc_domain::error::Result;
use mlc_domain::events::{EventType, InvalidationEvent, InvalidationScope, WireEvent};
use mlc_domain::ports::{ScheduledTask, TaskScheduler};
use mlc_domain::value_objects::{CacheStrategy, InvalidationStats, KeyPattern};
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;

/// Source recorded on follow-up events emitted for dependents
pub const DEPENDENCY_SOURCE: &str = "dependency-tracker";

/// Everything a set of events asks to invalidate
#[derive(Debug, Default)]
struct Work {
    patterns: BTreeSet<KeyPattern>,
    strategies: Vec<CacheStrategy>,
    delay: Duration,
    events: BTreeMap<EventType, u64>,
    fan_out: bool,
}

impl Work {
    fn for_event(event_type: EventType) -> Self {
        Self {
            events: BTreeMap::from([(event_type, 1)]),
            fan_out: event_type != EventType::DependencyChange,
            ..Self::default()
        }
    }

    fn add_strategy(&mut self, strategy: &CacheStrategy) {
        if !self.strategies.contains(strategy) {
            self.strategies.push(strategy.clone());
        }
    }

    fn absorb(&mut self, other: Work) {
        self.patterns.extend(other.patterns);
        for strategy in &other.strategies {
            self.add_strategy(strategy);
        }
        self.delay = self.delay.max(other.delay);
        for (event_type, count) in other.events {
            *self.events.entry(event_type).or_default() += count;
        }
        self.fan_out |= other.fan_out;
    }

    fn event_count(&self) -> u64 {
        self.events.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BatchKey {
    event_type: EventType,
    scope: String,
}

#[derive(Debug)]
struct Bucket {
    work: Work,
    opened_at: Instant,
}

#[derive(Debug)]
struct EngineStats {
    total: u64,
    by_type: HashMap<String, u64>,
    average_ms: f64,
    last_invalidation: Option<DateTime<Utc>>,
    last_success: Instant,
}

struct EngineInner {
    cache: MultiLevelCache,
    scheduler: Arc<dyn TaskScheduler>,
    config: InvalidationConfig,
    default_strategy: RwLock<CacheStrategy>,
    rules: RwLock<Vec<InvalidationRule>>,
    queue: Mutex<VecDeque<InvalidationEvent>>,
    processing: AtomicBool,
    batches: Mutex<HashMap<BatchKey, Bucket>>,
    dependencies: RwLock<HashMap<String, BTreeSet<String>>>,
    stats: Mutex<EngineStats>,
    timer: Mutex<Option<ScheduledTask>>,
}

/// Rule-driven invalidation over a [`MultiLevelCache`]
///
/// Cheap to clone; clones share the queue, rules and statistics.
#[derive(Clone)]
pub struct InvalidationEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for InvalidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationEngine")
            .field("rules", &self.rules())
            .field("queue_size", &self.queue_size())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl InvalidationEngine {
    /// Create an engine without rules
    pub fn new(
        cache: MultiLevelCache,
        scheduler: Arc<dyn TaskScheduler>,
        config: InvalidationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                cache,
                scheduler,
                config,
                default_strategy: RwLock::new(CacheStrategy::new()),
                rules: RwLock::new(Vec::new()),
                queue: Mutex::new(VecDeque::new()),
                processing: AtomicBool::new(false),
                batches: Mutex::new(HashMap::new()),
                dependencies: RwLock::new(HashMap::new()),
                stats: Mutex::new(EngineStats {
                    total: 0,
                    by_type: HashMap::new(),
                    average_ms: 0.0,
                    last_invalidation: None,
                    last_success: Instant::now(),
                }),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Create an engine with the built-in rules registered
    pub fn with_default_rules(
        cache: MultiLevelCache,
        scheduler: Arc<dyn TaskScheduler>,
        config: InvalidationConfig,
    ) -> Self {
        let engine = Self::new(cache, scheduler, config);
        for rule in super::defaults::default_rules() {
            engine.add_rule(rule);
        }
        engine
    }

    /// Cache the engine invalidates
    pub fn cache(&self) -> &MultiLevelCache {
        &self.inner.cache
    }

    /// Configuration in use
    pub fn config(&self) -> &InvalidationConfig {
        &self.inner.config
    }

    /// Strategy used by rules that do not name one
    pub fn default_strategy(&self) -> CacheStrategy {
        self.inner.default_strategy.read().clone()
    }

    /// Replace the strategy used by rules that do not name one
    pub fn set_default_strategy(&self, strategy: CacheStrategy) {
        *self.inner.default_strategy.write() = strategy;
    }

    // ---- rules ----

    /// Register a rule, replacing any rule with the same name
    pub fn add_rule(&self, rule: InvalidationRule) {
        let mut rules = self.inner.rules.write();
        rules.retain(|existing| existing.name() != rule.name());
        tracing::debug!(rule = rule.name(), event_type = %rule.event_type(), "Registered invalidation rule");
        rules.push(rule);
    }

    /// Remove a rule by name; `false` if none was registered
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules = self.inner.rules.write();
        let before = rules.len();
        rules.retain(|rule| rule.name() != name);
        rules.len() != before
    }

    /// Names of the registered rules in registration order
    pub fn rules(&self) -> Vec<String> {
        self.inner
            .rules
            .read()
            .iter()
            .map(|rule| rule.name().to_string())
            .collect()
    }

    // ---- dependencies ----

    /// Invalidate `dependent` whenever `prerequisite` is invalidated
    pub fn add_dependency(&self, dependent: &str, prerequisite: &str) {
        self.inner
            .dependencies
            .write()
            .entry(prerequisite.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// Forget one dependency; `false` if it was not registered
    pub fn remove_dependency(&self, dependent: &str, prerequisite: &str) -> bool {
        let mut dependencies = self.inner.dependencies.write();
        let Some(dependents) = dependencies.get_mut(prerequisite) else {
            return false;
        };
        let removed = dependents.remove(dependent);
        if dependents.is_empty() {
            dependencies.remove(prerequisite);
        }
        removed
    }

    /// Keys registered as depending on `prerequisite`, sorted
    pub fn dependents_of(&self, prerequisite: &str) -> Vec<String> {
        self.inner
            .dependencies
            .read()
            .get(prerequisite)
            .map(|dependents| dependents.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ---- intake ----

    /// Queue an event and schedule a drain
    ///
    /// Never blocks on cache I/O.
    pub fn invalidate(&self, event: InvalidationEvent) {
        tracing::debug!(
            event_type = %event.event_type(),
            source = %event.source,
            "Invalidation event queued"
        );
        self.inner.queue.lock().push_back(event);
        self.schedule_drain();
    }

    /// Validate a wire event and queue it
    pub fn invalidate_wire(&self, wire: WireEvent) -> Result<()> {
        let event = InvalidationEvent::from_wire(wire)?;
        self.invalidate(event);
        Ok(())
    }

    /// Invalidate patterns directly, bypassing rules and the queue
    ///
    /// Registered dependents of the patterns are still invalidated.
    pub async fn invalidate_keys<I>(&self, patterns: I, strategy: Option<CacheStrategy>)
    where
        I: IntoIterator<Item = KeyPattern>,
    {
        let mut work = Work {
            patterns: patterns.into_iter().collect(),
            fan_out: true,
            ..Work::default()
        };
        if let Some(strategy) = &strategy {
            work.add_strategy(strategy);
        }
        self.execute(work).await;
    }

    /// Events waiting for a drain
    pub fn queue_size(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Events parked in batch buckets
    pub fn pending_batched(&self) -> usize {
        self.inner
            .batches
            .lock()
            .values()
            .map(|bucket| bucket.work.event_count())
            .sum::<u64>()
            .try_into()
            .unwrap_or(usize::MAX)
    }

    fn schedule_drain(&self) {
        let engine = self.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            engine.process_queue().await;
        }));
    }

    // ---- processing ----

    /// Drain the queue
    ///
    /// Returns immediately when another drain is running. Events queued
    /// while draining are picked up before returning; due batch buckets are
    /// flushed at the end.
    pub async fn process_queue(&self) {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("Invalidation drain already running");
            return;
        }

        loop {
            let events: Vec<InvalidationEvent> = self.inner.queue.lock().drain(..).collect();
            if events.is_empty() {
                break;
            }
            tracing::debug!(events = events.len(), "Draining invalidation queue");
            for event in events {
                self.dispatch(event).await;
            }
        }
        self.flush_due_batches().await;

        self.inner.processing.store(false, Ordering::Release);
        if !self.inner.queue.lock().is_empty() {
            self.schedule_drain();
        }
    }

    /// Flush every batch bucket now, ignoring the window
    pub async fn flush_batches(&self) {
        for work in self.take_batches(|_| true) {
            self.run(work).await;
        }
    }

    async fn flush_due_batches(&self) {
        let window = self.inner.config.batch_window();
        for work in self.take_batches(|bucket| bucket.opened_at.elapsed() >= window) {
            self.run(work).await;
        }
    }

    fn take_batches(&self, due: impl Fn(&Bucket) -> bool) -> Vec<Work> {
        let mut batches = self.inner.batches.lock();
        let keys: Vec<BatchKey> = batches
            .iter()
            .filter(|(_, bucket)| due(bucket))
            .map(|(key, _)| key.clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| {
                let bucket = batches.remove(&key)?;
                tracing::debug!(
                    event_type = %key.event_type,
                    scope = %key.scope,
                    events = bucket.work.event_count(),
                    patterns = bucket.work.patterns.len(),
                    "Flushing invalidation batch"
                );
                Some(bucket.work)
            })
            .collect()
    }

    /// Union of what every matching rule asks for, and whether any batches
    fn plan(&self, event: &InvalidationEvent) -> Option<(Work, bool)> {
        let rules = self.inner.rules.read().clone();
        let mut work = Work::for_event(event.event_type());
        let mut batch = false;
        let mut matched = 0usize;

        for rule in &rules {
            match rule.matches(event) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(rule = rule.name(), error = %e, "Invalidation rule matcher failed");
                    continue;
                }
            }
            let patterns = match rule.keys_for(event) {
                Ok(patterns) => patterns,
                Err(e) => {
                    tracing::warn!(rule = rule.name(), error = %e, "Invalidation key generator failed");
                    continue;
                }
            };
            matched += 1;
            work.patterns.extend(patterns);
            if let Some(strategy) = rule.strategy() {
                work.add_strategy(strategy);
            }
            if let Some(delay) = rule.delay() {
                work.delay = work.delay.max(delay);
            }
            batch |= rule.is_batched();
        }

        (matched > 0).then_some((work, batch))
    }

    async fn dispatch(&self, event: InvalidationEvent) {
        let Some((work, batch)) = self.plan(&event) else {
            tracing::debug!(event_type = %event.event_type(), "No invalidation rule matched");
            return;
        };
        if batch {
            self.enqueue_batch(&event, work);
        } else {
            self.run(work).await;
        }
    }

    async fn run(&self, work: Work) {
        if work.delay.is_zero() {
            self.execute(work).await;
        } else {
            self.schedule_execute(work);
        }
    }

    fn schedule_execute(&self, work: Work) {
        let engine = self.clone();
        let delay = work.delay;
        tracing::debug!(?delay, patterns = work.patterns.len(), "Invalidation delayed");
        self.inner.scheduler.schedule(
            delay,
            Box::pin(async move {
                engine.execute(work).await;
            }),
        );
    }

    fn enqueue_batch(&self, event: &InvalidationEvent, work: Work) {
        let key = BatchKey {
            event_type: event.event_type(),
            scope: event.scope.batch_scope().to_string(),
        };
        let opened = match self.inner.batches.lock().entry(key) {
            Entry::Occupied(mut bucket) => {
                bucket.get_mut().work.absorb(work);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Bucket {
                    work,
                    opened_at: Instant::now(),
                });
                true
            }
        };
        if opened {
            let engine = self.clone();
            self.inner.scheduler.schedule(
                self.inner.config.batch_window(),
                Box::pin(async move {
                    engine.flush_due_batches().await;
                }),
            );
        }
    }

    async fn execute(&self, work: Work) {
        let started = Instant::now();
        let strategies = if work.strategies.is_empty() {
            vec![self.default_strategy()]
        } else {
            work.strategies.clone()
        };

        let mut attempted = 0usize;
        let mut failed: Vec<String> = Vec::new();
        for pattern in &work.patterns {
            for strategy in &strategies {
                attempted += 1;
                if let Err(e) = self.inner.cache.invalidate(pattern, strategy).await {
                    tracing::debug!(pattern = %pattern, error = %e, "Invalidation failed");
                    failed.push(pattern.to_string());
                }
            }
        }

        if !failed.is_empty() {
            let sample: Vec<&String> = failed.iter().take(FAILED_KEYS_LOG_SAMPLE).collect();
            tracing::warn!(failed = failed.len(), attempted, ?sample, "Some invalidations failed");
        }
        if work.fan_out {
            self.fan_out(&work.patterns);
        }
        self.record(&work, started.elapsed(), attempted == 0 || failed.len() < attempted);
        tracing::debug!(
            patterns = work.patterns.len(),
            events = work.event_count(),
            "Invalidation executed"
        );
    }

    fn fan_out(&self, patterns: &BTreeSet<KeyPattern>) {
        let events: Vec<InvalidationEvent> = self
            .inner
            .dependencies
            .read()
            .iter()
            .filter(|(prerequisite, _)| patterns.iter().any(|pattern| pattern.matches(prerequisite)))
            .map(|(prerequisite, dependents)| {
                InvalidationEvent::new(
                    InvalidationScope::DependencyChange {
                        prerequisite: prerequisite.clone(),
                        dependents: dependents.iter().cloned().collect(),
                    },
                    DEPENDENCY_SOURCE,
                )
            })
            .collect();
        if events.is_empty() {
            return;
        }
        tracing::debug!(events = events.len(), "Queueing dependent invalidations");
        self.inner.queue.lock().extend(events);
        self.schedule_drain();
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&self, work: &Work, elapsed: Duration, succeeded: bool) {
        let mut stats = self.inner.stats.lock();
        stats.total += 1;
        for (event_type, count) in &work.events {
            *stats.by_type.entry(event_type.as_str().to_string()).or_default() += count;
        }
        let millis = elapsed.as_secs_f64() * 1000.0;
        stats.average_ms += (millis - stats.average_ms) / stats.total as f64;
        stats.last_invalidation = Some(Utc::now());
        if succeeded {
            stats.last_success = Instant::now();
        }
    }

    // ---- observability ----

    /// Counters, averages and backlog
    pub fn get_stats(&self) -> InvalidationStats {
        let queue_size = self.queue_size();
        let pending_batched = self.pending_batched();
        let stats = self.inner.stats.lock();
        InvalidationStats {
            total_invalidations: stats.total,
            by_type: stats.by_type.clone(),
            average_processing_ms: stats.average_ms,
            last_invalidation: stats.last_invalidation,
            queue_size,
            pending_batched,
        }
    }

    /// Zero the counters
    pub fn reset_stats(&self) {
        let mut stats = self.inner.stats.lock();
        stats.total = 0;
        stats.by_type.clear();
        stats.average_ms = 0.0;
        stats.last_invalidation = None;
    }

    /// Queue within bounds and, if events wait, a recent success
    pub fn is_healthy(&self) -> bool {
        let queued = self.queue_size();
        if queued > self.inner.config.max_queue_size {
            return false;
        }
        queued == 0 || self.inner.stats.lock().last_success.elapsed() <= self.inner.config.stale_after()
    }

    // ---- lifecycle ----

    /// Start the periodic background drain
    ///
    /// The timer holds only a weak reference and stops once every engine
    /// clone is dropped. Calling `start` again restarts it.
    pub fn start(&self) {
        let interval = self.inner.config.drain_interval();
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let handle = self.inner.scheduler.spawn(Box::pin(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                InvalidationEngine { inner }.process_queue().await;
            }
        }));
        if let Some(previous) = self.inner.timer.lock().replace(handle) {
            previous.cancel();
        }
        tracing::info!(interval_ms = self.inner.config.drain_interval_ms, "Invalidation engine started");
    }

    /// Stop the periodic drain; queued events stay queued
    pub fn stop(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.cancel();
            tracing::info!("Invalidation engine stopped");
        }
    }
}
