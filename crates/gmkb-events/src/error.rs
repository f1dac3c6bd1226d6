//! Event bus error types.

use thiserror::Error;

/// Errors returned by [`EventBus`](crate::EventBus) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A registration argument was malformed (bad event name, empty id).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `wait_for` expired before the event was emitted.
    #[error("Timeout waiting for event: {event} after {timeout_ms}ms")]
    Timeout {
        /// The awaited event name.
        event: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
}

impl EventError {
    /// Returns a short stable label for logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Result type for event bus operations.
pub type EventResult<T> = Result<T, EventError>;

/// Error a listener callback may return; it is logged and never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EventError::Timeout {
            event: "startup:done".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "Timeout waiting for event: startup:done after 250ms"
        );
        assert_eq!(err.as_label(), "timeout");

        let err = EventError::InvalidArgument("event name must not be empty".into());
        assert_eq!(err.as_label(), "invalid_argument");
        assert!(err.to_string().contains("must not be empty"));
    }
}
