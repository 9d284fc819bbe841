//! Tokio task scheduler
//!
//! [`TaskScheduler`] implementation backed by `tokio::spawn`. Every task it
//! starts is tracked so [`TokioScheduler::shutdown`] can abort outstanding
//! work when the owning context goes away.

use dashmap::DashMap;
use mlc_domain::ports::{DeferredTask, ScheduledTask, TaskHandle, TaskScheduler};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Handle to a task started by [`TokioScheduler`]
#[derive(Debug)]
pub struct TokioTaskHandle(AbortHandle);

impl TaskHandle for TokioTaskHandle {
    fn cancel(&self) {
        self.0.abort();
    }

    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Scheduler running deferred work on the current tokio runtime
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
    active: Arc<DashMap<u64, AbortHandle>>,
    next_id: Arc<AtomicU64>,
}

impl TokioScheduler {
    /// Create a scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.active.retain(|_, handle| !handle.is_finished());
        self.active.len()
    }

    /// Abort every outstanding task
    pub fn shutdown(&self) {
        let aborted = self.active.len();
        for entry in self.active.iter() {
            entry.value().abort();
        }
        self.active.clear();
        if aborted > 0 {
            tracing::debug!(aborted, "Aborted scheduled tasks");
        }
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: DeferredTask) -> ScheduledTask {
        self.active.retain(|_, handle| !handle.is_finished());

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::clone(&self.active);
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
            active.remove(&id);
        });

        let abort = handle.abort_handle();
        self.active.insert(id, abort.clone());
        Box::new(TokioTaskHandle(abort))
    }
}
