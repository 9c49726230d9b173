//! The client side of an exchange: handles and the callback trait.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::error::TransportError;
use crate::header::HeaderMap;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one request/response exchange.
///
/// The engine passes it back unchanged with every callback so a client
/// juggling several exchanges can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryHandle(u64);

impl DeliveryHandle {
    /// Allocate a fresh, process-unique handle.
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-chosen identifier.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeliveryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receiver of the lifecycle callbacks a network stack would emit.
///
/// For one exchange the engine calls these strictly in order and never
/// concurrently: `on_response_received` once, `on_data_received` one or
/// more times, then `on_finished`. An error response produces a single
/// `on_failed` instead. A cancelled exchange simply stops; there is no
/// cancellation callback.
///
/// Callbacks run on the engine's scheduler. Implementations may call
/// [`DeliveryEngine::cancel_delivery`](crate::DeliveryEngine::cancel_delivery)
/// from inside a callback.
pub trait DeliveryClient: Send + Sync {
    fn on_response_received(&self, handle: DeliveryHandle, status: u16, headers: &HeaderMap);

    fn on_data_received(&self, handle: DeliveryHandle, data: Bytes);

    fn on_finished(&self, handle: DeliveryHandle);

    fn on_failed(&self, handle: DeliveryHandle, error: &TransportError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_handles_are_unique() {
        let a = DeliveryHandle::next();
        let b = DeliveryHandle::next();
        assert_ne!(a, b);
    }

    #[test]
    fn raw_handles_round_trip() {
        let h = DeliveryHandle::from_raw(42);
        assert_eq!(h.as_raw(), 42);
        assert_eq!(h, DeliveryHandle::from_raw(42));
        assert_eq!(h.to_string(), "#42");
    }
}
