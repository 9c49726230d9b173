//! Timers for playback steps.
//!
//! The engine never sleeps or spawns on its own. Every step is handed to a
//! [`Scheduler`] as a boxed closure together with the delay before it may
//! run, and the returned [`ScheduledTask`] is the token used to drop the
//! step again on cancellation.
//!
//! Two implementations are provided:
//!
//! - [`TokioScheduler`] runs steps as tokio tasks on a runtime handle.
//! - [`ManualScheduler`] keeps a virtual clock and runs steps only when a
//!   test drives it, which makes delay behaviour fully deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::trace;

use crate::error::{DeliveryError, DeliveryResult};

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation token for one scheduled task.
///
/// Dropping the token leaves the task scheduled. Only
/// [`cancel()`](ScheduledTask::cancel) removes it.
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A token whose cancellation does nothing.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Prevent the task from running if it has not started yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Runs tasks after a delay without blocking the caller.
///
/// Implementations must never run `task` inside the `schedule_after` call,
/// even for a zero delay.
pub trait Scheduler: Send + Sync {
    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledTask;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledTask {
        (**self).schedule_after(delay, task)
    }
}

// ── Tokio ───────────────────────────────────────────────────────────

/// Schedules each task as its own tokio task.
///
/// A zero delay still goes through `spawn`, so the task runs once the
/// runtime next polls it. Cancellation aborts the tokio task; a task whose
/// closure has already started runs to completion.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is currently running on.
    pub fn current() -> DeliveryResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| DeliveryError::NoRuntime(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledTask {
        let join = self.handle.spawn(async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            task();
        });
        let abort = join.abort_handle();
        ScheduledTask::new(move || abort.abort())
    }
}

// ── Manual (virtual clock) ──────────────────────────────────────────

/// A deterministic scheduler driven by the test.
///
/// Tasks are queued with a due time on a virtual clock that starts at
/// zero and moves only through [`advance()`](ManualScheduler::advance).
/// Tasks due at the same instant run in the order they were scheduled.
/// The queue lock is never held while a task runs, so tasks may schedule
/// further tasks.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    tasks: BTreeMap<(Duration, u64), Task>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Due time of the earliest waiting task.
    pub fn next_due(&self) -> Option<Duration> {
        self.lock().tasks.keys().next().map(|(due, _)| *due)
    }

    /// Run every task due at the current virtual time, including tasks
    /// scheduled with zero delay by the tasks being run.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let now = self.now();
        self.run_due(now)
    }

    /// Move the clock forward by `by`, running due tasks in time order.
    ///
    /// While a task runs, the clock reads that task's due time, so delays
    /// it schedules are measured from there. Returns the number of tasks
    /// run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let ran = self.run_due(target);
        let mut queue = self.lock();
        if queue.now < target {
            queue.now = target;
        }
        ran
    }

    /// Keep advancing to the next due task until the queue is empty.
    ///
    /// Returns the number of tasks run.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due() {
            ran += self.run_due(due);
        }
        ran
    }

    fn run_due(&self, until: Duration) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut queue = self.lock();
                let Some(entry) = queue.tasks.first_entry() else {
                    break;
                };
                let (due, _) = *entry.key();
                if due > until {
                    break;
                }
                let task = entry.remove();
                if queue.now < due {
                    queue.now = due;
                }
                task
            };
            task();
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledTask {
        let key = {
            let mut queue = self.lock();
            let key = (queue.now + delay, queue.next_seq);
            queue.next_seq += 1;
            queue.tasks.insert(key, task);
            key
        };
        trace!(due = ?key.0, seq = key.1, "manual task scheduled");

        let queue: Weak<Mutex<ManualQueue>> = Arc::downgrade(&self.queue);
        ScheduledTask::new(move || {
            if let Some(queue) = queue.upgrade() {
                let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
                queue.tasks.remove(&key);
            }
        })
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &queue.now)
            .field("pending", &queue.tasks.len())
            .finish()
    }
}
