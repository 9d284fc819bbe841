//! Task Scheduler Port
//!
//! Deferred work (write-back pushes, refresh-ahead reloads, delayed
//! invalidations) goes through this port instead of ad hoc timers. The owner
//! of the scheduler can cancel whatever is still outstanding.

use futures::future::BoxFuture;
use std::time::Duration;

/// A unit of deferred work
pub type DeferredTask = BoxFuture<'static, ()>;

/// Handle to a scheduled task
pub trait TaskHandle: Send + Sync + std::fmt::Debug {
    /// Cancel the task if it has not completed
    fn cancel(&self);

    /// Whether the task completed or was cancelled
    fn is_finished(&self) -> bool;
}

/// Owned handle returned by [`TaskScheduler::schedule`]
pub type ScheduledTask = Box<dyn TaskHandle>;

/// Task Scheduler Port
///
/// # Example
///
/// ```ignore
/// let handle = scheduler.schedule(Duration::from_secs(5), Box::pin(async move {
///     engine.process_queue().await;
/// }));
/// ```
pub trait TaskScheduler: Send + Sync + std::fmt::Debug {
    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: DeferredTask) -> ScheduledTask;

    /// Run `task` as soon as possible
    fn spawn(&self, task: DeferredTask) -> ScheduledTask {
        self.schedule(Duration::ZERO, task)
    }
}
