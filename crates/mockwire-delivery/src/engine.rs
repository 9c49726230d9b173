//! The response delivery engine.
//!
//! A [`DeliveryEngine`] plays one [`ResponseSpec`] back to one
//! [`DeliveryClient`] as a chain of scheduled steps:
//!
//! ```text
//! begin_delivery ─► Respond ─┬─► Chunk(0) ─► Chunk(1) … Chunk(n-1) ─► Finish
//!                            │   (zero delay)  (inter-chunk delay)    (zero delay)
//!                            └─► (error spec: on_failed, done)
//! ```
//!
//! Each step is scheduled only after the previous callback has returned,
//! which keeps callbacks for one exchange ordered and non-overlapping.
//!
//! # Cancellation
//!
//! All state lives behind one mutex. A step checks and advances the state
//! under the lock, releases it, then emits its callback, so a client may
//! cancel from inside a callback. Once `cancel_delivery` has stored
//! `Cancelled`, no step that has not yet passed its check will emit, and
//! the pending step is removed from the scheduler.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::chunk::ChunkPlan;
use crate::client::{DeliveryClient, DeliveryHandle};
use crate::error::{DeliveryError, DeliveryResult};
use crate::response::{ResponseKind, ResponseSpec};
use crate::scheduler::{ScheduledTask, Scheduler};

/// Lifecycle of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    Scheduled,
    Delivering,
    Cancelled,
    Completed,
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryState::Cancelled | DeliveryState::Completed)
    }
}

/// Plays a canned response back to a client, once.
///
/// An engine serves exactly one exchange: [`begin_delivery`] succeeds the
/// first time and is rejected afterwards. Neither `begin_delivery` nor
/// [`cancel_delivery`] waits for a callback, and no callback runs before
/// `begin_delivery` has returned.
///
/// Dropping the engine does not cancel an exchange in progress.
///
/// [`begin_delivery`]: DeliveryEngine::begin_delivery
/// [`cancel_delivery`]: DeliveryEngine::cancel_delivery
pub struct DeliveryEngine {
    scheduler: Arc<dyn Scheduler>,
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
}

struct Inner {
    state: DeliveryState,
    handle: Option<DeliveryHandle>,
    /// Token for the step currently waiting on the scheduler.
    pending: Option<ScheduledTask>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DeliveryEngine {
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_scheduler(Arc::new(scheduler))
    }

    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: DeliveryState::Idle,
                    handle: None,
                    pending: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.shared.lock().state
    }

    /// Start playing `spec` back to `client` for the exchange `handle`.
    ///
    /// Only schedules the first step; every callback happens later on the
    /// scheduler.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::AlreadyStarted`] if this engine has already begun a
    /// delivery, [`DeliveryError::Cancelled`] if it was cancelled before
    /// being started. The engine's state is left untouched in both cases.
    pub fn begin_delivery(
        &self,
        spec: impl Into<Arc<ResponseSpec>>,
        handle: DeliveryHandle,
        client: Arc<dyn DeliveryClient>,
    ) -> DeliveryResult<()> {
        let mut inner = self.shared.lock();
        match inner.state {
            DeliveryState::Idle => {}
            DeliveryState::Cancelled => {
                warn!(%handle, "begin_delivery on a cancelled engine");
                return Err(DeliveryError::Cancelled);
            }
            state => {
                warn!(%handle, ?state, "begin_delivery called twice");
                return Err(DeliveryError::AlreadyStarted);
            }
        }

        let spec = spec.into();
        let chunks = spec.chunk_plan();
        debug!(
            %handle,
            error = spec.is_error(),
            chunks = chunks.as_ref().map_or(0, ChunkPlan::len),
            delay = ?spec.inter_chunk_delay(),
            "delivery scheduled"
        );

        let playback = Arc::new(Playback {
            shared: Arc::clone(&self.shared),
            scheduler: Arc::clone(&self.scheduler),
            spec,
            chunks,
            handle,
            client,
        });

        inner.state = DeliveryState::Scheduled;
        inner.handle = Some(handle);
        playback.schedule(&mut inner, Step::Respond, Duration::ZERO);
        Ok(())
    }

    /// Stop the exchange. No callback is emitted after this returns, apart
    /// from one that was already running when it was called.
    ///
    /// Idempotent, and a no-op on a completed exchange. Cancelling an idle
    /// engine makes any later `begin_delivery` fail.
    pub fn cancel_delivery(&self) {
        let pending = {
            let mut inner = self.shared.lock();
            if inner.state.is_terminal() {
                return;
            }
            debug!(handle = ?inner.handle, from = ?inner.state, "delivery cancelled");
            inner.state = DeliveryState::Cancelled;
            inner.pending.take()
        };

        if let Some(task) = pending {
            task.cancel();
        }
    }
}

impl std::fmt::Debug for DeliveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("DeliveryEngine")
            .field("state", &inner.state)
            .field("handle", &inner.handle)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Respond,
    Chunk(usize),
    Finish,
}

/// Everything the scheduled steps of one exchange need.
struct Playback {
    shared: Arc<Shared>,
    scheduler: Arc<dyn Scheduler>,
    spec: Arc<ResponseSpec>,
    /// `None` for error responses.
    chunks: Option<ChunkPlan>,
    handle: DeliveryHandle,
    client: Arc<dyn DeliveryClient>,
}

impl Playback {
    /// Queue `step` on the scheduler. Caller holds the state lock.
    fn schedule(self: &Arc<Self>, inner: &mut Inner, step: Step, delay: Duration) {
        let this = Arc::clone(self);
        let task = self
            .scheduler
            .schedule_after(delay, Box::new(move || this.run(step)));
        inner.pending = Some(task);
    }

    /// Queue `step` unless the exchange was cancelled meanwhile.
    fn schedule_next(self: &Arc<Self>, step: Step, delay: Duration) {
        let mut inner = self.shared.lock();
        if inner.state != DeliveryState::Delivering {
            trace!(handle = %self.handle, ?step, state = ?inner.state, "not scheduling next step");
            return;
        }
        self.schedule(&mut inner, step, delay);
    }

    fn run(self: Arc<Self>, step: Step) {
        let mut inner = self.shared.lock();
        inner.pending = None;

        let expected = match step {
            Step::Respond => DeliveryState::Scheduled,
            Step::Chunk(_) | Step::Finish => DeliveryState::Delivering,
        };
        if inner.state != expected {
            trace!(handle = %self.handle, ?step, state = ?inner.state, "step skipped");
            return;
        }

        match (step, self.spec.kind()) {
            (Step::Respond, ResponseKind::Error(error)) => {
                inner.state = DeliveryState::Completed;
                drop(inner);
                debug!(handle = %self.handle, %error, "delivering transport error");
                self.client.on_failed(self.handle, error);
            }
            (Step::Respond, ResponseKind::Success(response)) => {
                inner.state = DeliveryState::Delivering;
                drop(inner);
                debug!(handle = %self.handle, status = response.status, "delivering response");
                self.client
                    .on_response_received(self.handle, response.status, &response.headers);
                self.schedule_next(Step::Chunk(0), Duration::ZERO);
            }
            (Step::Chunk(index), _) => {
                drop(inner);
                let Some(chunk) = self.chunks.as_ref().and_then(|c| c.get(index)) else {
                    return;
                };
                trace!(handle = %self.handle, index, len = chunk.len(), "delivering chunk");
                self.client.on_data_received(self.handle, chunk.clone());

                let total = self.chunks.as_ref().map_or(0, ChunkPlan::len);
                if index + 1 < total {
                    self.schedule_next(Step::Chunk(index + 1), self.spec.inter_chunk_delay());
                } else {
                    self.schedule_next(Step::Finish, Duration::ZERO);
                }
            }
            (Step::Finish, _) => {
                inner.state = DeliveryState::Completed;
                drop(inner);
                debug!(handle = %self.handle, "delivery finished");
                self.client.on_finished(self.handle);
            }
        }
    }
}
