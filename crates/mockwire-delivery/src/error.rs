//! Error types for mock response delivery.
//!
//! Two unrelated things live here. [`TransportError`] is a *value* the
//! engine plays back to the client as a simulated connection failure.
//! [`DeliveryError`] is returned to the caller of the engine when it is
//! misused; it never reaches the client.

use thiserror::Error;

/// A simulated connection-level failure.
///
/// Carries a human-readable message and an optional numeric code (for
/// clients that switch on platform error codes such as "timed out" or
/// "cannot connect to host"). The engine never inspects either field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    code: Option<i64>,
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TransportError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TransportError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Misuse of a [`DeliveryEngine`](crate::DeliveryEngine) or scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery already started for this engine")]
    AlreadyStarted,

    #[error("delivery was cancelled before it started")]
    Cancelled,

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Result type alias for engine operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
