//! Coordination state machine and phase log types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Coordinator state. Transitions only move forward through this order;
/// a run returns to `Idle` on failure or `reset()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinationState {
    /// No run in flight.
    #[default]
    Idle,
    /// Run started; waiting for systems and templates.
    Coordinating,
    /// Rendering blocked while data is hydrated.
    DataLoading,
    /// Rendering unblocked; deferred work and validation.
    Rendering,
    /// Run finished (normally or via the watchdog).
    Complete,
}

impl CoordinationState {
    /// Upper-case name as reported in status output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Coordinating => "COORDINATING",
            Self::DataLoading => "DATA_LOADING",
            Self::Rendering => "RENDERING",
            Self::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for CoordinationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, timed step of a coordination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseName {
    /// Wait for the required systems to register.
    SystemsReady,
    /// Preload critical templates.
    TemplatePreload,
    /// Hydrate state from the external data source.
    MkcgHydration,
    /// Wait for outstanding template/state operations.
    PendingOperations,
    /// Run work deferred while rendering was blocked.
    DeferredOperations,
    /// Final consistency checks.
    Validation,
}

impl PhaseName {
    /// Upper-case phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SystemsReady => "SYSTEMS_READY",
            Self::TemplatePreload => "TEMPLATE_PRELOAD",
            Self::MkcgHydration => "MKCG_HYDRATION",
            Self::PendingOperations => "PENDING_OPERATIONS",
            Self::DeferredOperations => "DEFERRED_OPERATIONS",
            Self::Validation => "VALIDATION",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sealed record of one phase execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    /// Which phase ran.
    pub name: PhaseName,
    /// Wall time spent in the phase, in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Whether the phase succeeded.
    pub success: bool,
    /// Failure message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the phase finished.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        assert!(CoordinationState::Idle < CoordinationState::Coordinating);
        assert!(CoordinationState::DataLoading < CoordinationState::Rendering);
        assert!(CoordinationState::Rendering < CoordinationState::Complete);
        assert_eq!(CoordinationState::DataLoading.to_string(), "DATA_LOADING");
    }

    #[test]
    fn test_serialized_names_match_display() {
        let json = serde_json::to_value(PhaseName::PendingOperations).unwrap();
        assert_eq!(json, "PENDING_OPERATIONS");
        let json = serde_json::to_value(CoordinationState::Complete).unwrap();
        assert_eq!(json, CoordinationState::Complete.as_str());
    }

    #[test]
    fn test_phase_record_serialization() {
        let record = PhaseRecord {
            name: PhaseName::SystemsReady,
            duration_ms: 12,
            success: true,
            error: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "SYSTEMS_READY");
        assert_eq!(json["duration"], 12);
        assert!(json.get("error").is_none());
    }
}
