//! Startup coordination error types.

use gmkb_events::EventError;
use thiserror::Error;

use crate::phase::PhaseName;

/// Opaque failure reported by an external collaborator (preloader,
/// hydrator, deferred operation). Carried for logging, never reclassified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    /// Create an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture the display form of any error.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for CollaboratorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CollaboratorError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Errors that abort a coordination run.
///
/// `Clone` so every caller awaiting a shared run observes the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    /// Required systems were still missing when `SYSTEMS_READY` timed out.
    #[error("Required systems not ready: {}", missing.join(", "))]
    SystemsNotReady {
        /// Names still missing at timeout.
        missing: Vec<String>,
        /// How long the phase waited.
        waited_ms: u64,
    },

    /// One or more final validation checks failed.
    #[error("Startup validation failed: {}", failed_checks.join(", "))]
    StartupValidationFailed {
        /// Names of the failed checks.
        failed_checks: Vec<String>,
    },

    /// A collaborator failed during a phase that does not tolerate failure.
    #[error("{phase} failed: {source}")]
    Collaborator {
        /// Phase the failure occurred in.
        phase: PhaseName,
        /// The collaborator's error.
        source: CollaboratorError,
    },

    /// Subscribing to the event bus failed.
    #[error("Event bus error: {0}")]
    Event(#[from] EventError),

    /// The run was aborted by `reset()` or its task ended abnormally.
    #[error("Startup run aborted")]
    Aborted,
}

impl StartupError {
    /// Returns a short stable label for logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::SystemsNotReady { .. } => "systems_not_ready",
            Self::StartupValidationFailed { .. } => "validation_failed",
            Self::Collaborator { .. } => "collaborator",
            Self::Event(_) => "event_bus",
            Self::Aborted => "aborted",
        }
    }
}

/// Result type for startup coordination.
pub type StartupResult<T> = Result<T, StartupError>;

/// How a deferred operation settled without succeeding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// The operation ran and failed.
    #[error("Deferred operation failed: {0}")]
    Failed(#[from] CollaboratorError),

    /// The operation was discarded without running (emergency fallback or reset).
    #[error("Deferred operation discarded")]
    Discarded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systems_not_ready_names_missing() {
        let err = StartupError::SystemsNotReady {
            missing: vec!["renderer".into(), "state_manager".into()],
            waited_ms: 5000,
        };
        assert_eq!(
            err.to_string(),
            "Required systems not ready: renderer, state_manager"
        );
        assert_eq!(err.as_label(), "systems_not_ready");
    }

    #[test]
    fn test_collaborator_error_display() {
        let err = StartupError::Collaborator {
            phase: PhaseName::MkcgHydration,
            source: CollaboratorError::new("storage unavailable"),
        };
        assert_eq!(
            err.to_string(),
            "MKCG_HYDRATION failed: storage unavailable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_failed_display() {
        let err = StartupError::StartupValidationFailed {
            failed_checks: vec!["renderingUnblocked".into()],
        };
        assert!(err.to_string().ends_with("renderingUnblocked"));
    }

    #[test]
    fn test_deferred_error_from_collaborator() {
        let err: DeferredError = CollaboratorError::from("nope").into();
        assert_eq!(err, DeferredError::Failed(CollaboratorError::new("nope")));
    }
}
