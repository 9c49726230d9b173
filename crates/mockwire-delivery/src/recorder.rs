//! A recording [`DeliveryClient`] for test harnesses.

use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::watch;

use crate::client::{DeliveryClient, DeliveryHandle};
use crate::error::TransportError;
use crate::header::HeaderMap;

/// One callback, as observed by a [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    ResponseReceived {
        handle: DeliveryHandle,
        status: u16,
        headers: HeaderMap,
    },
    DataReceived {
        handle: DeliveryHandle,
        data: Bytes,
    },
    Finished {
        handle: DeliveryHandle,
    },
    Failed {
        handle: DeliveryHandle,
        error: TransportError,
    },
}

impl DeliveryEvent {
    pub fn handle(&self) -> DeliveryHandle {
        match self {
            DeliveryEvent::ResponseReceived { handle, .. }
            | DeliveryEvent::DataReceived { handle, .. }
            | DeliveryEvent::Finished { handle }
            | DeliveryEvent::Failed { handle, .. } => *handle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryEvent::Finished { .. } | DeliveryEvent::Failed { .. })
    }
}

/// Called after each event has been recorded.
pub type EventHook = Box<dyn Fn(&DeliveryEvent) + Send + Sync>;

/// Records every callback in arrival order.
///
/// The optional hook runs after the event is stored and outside the
/// recorder's lock, so it may inspect the recorder or cancel the engine.
/// Async tests can wait for events with
/// [`wait_for_len()`](RecordingClient::wait_for_len) or
/// [`wait_for_terminal()`](RecordingClient::wait_for_terminal).
pub struct RecordingClient {
    events: Mutex<Vec<DeliveryEvent>>,
    hook: Option<EventHook>,
    /// Event count, bumped after every recorded event.
    progress: watch::Sender<usize>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            hook: None,
            progress: watch::Sender::new(0),
        }
    }

    pub fn with_hook(hook: impl Fn(&DeliveryEvent) + Send + Sync + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All received data, concatenated in order.
    pub fn body(&self) -> Vec<u8> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                DeliveryEvent::DataReceived { data, .. } => Some(data.as_ref()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Length of each data event, in order.
    pub fn chunk_lengths(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                DeliveryEvent::DataReceived { data, .. } => Some(data.len()),
                _ => None,
            })
            .collect()
    }

    /// Whether a finished or failed event has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.lock().iter().any(DeliveryEvent::is_terminal)
    }

    /// Wait until at least `n` events have been recorded.
    pub async fn wait_for_len(&self, n: usize) {
        let mut rx = self.progress.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Wait until a finished or failed event has been recorded.
    pub async fn wait_for_terminal(&self) {
        let mut rx = self.progress.subscribe();
        loop {
            if self.is_terminal() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn record(&self, event: DeliveryEvent) {
        let count = {
            let mut events = self.lock();
            events.push(event.clone());
            events.len()
        };
        self.progress.send_replace(count);
        if let Some(hook) = &self.hook {
            hook(&event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeliveryEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingClient")
            .field("events", &*self.lock())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl DeliveryClient for RecordingClient {
    fn on_response_received(&self, handle: DeliveryHandle, status: u16, headers: &HeaderMap) {
        self.record(DeliveryEvent::ResponseReceived {
            handle,
            status,
            headers: headers.clone(),
        });
    }

    fn on_data_received(&self, handle: DeliveryHandle, data: Bytes) {
        self.record(DeliveryEvent::DataReceived { handle, data });
    }

    fn on_finished(&self, handle: DeliveryHandle) {
        self.record(DeliveryEvent::Finished { handle });
    }

    fn on_failed(&self, handle: DeliveryHandle, error: &TransportError) {
        self.record(DeliveryEvent::Failed {
            handle,
            error: error.clone(),
        });
    }
}
