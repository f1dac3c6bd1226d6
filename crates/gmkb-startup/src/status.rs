//! Run outcomes and status snapshots.

use serde::Serialize;

use crate::error::StartupError;
use crate::operations::PendingOperations;
use crate::phase::{CoordinationState, PhaseName, PhaseRecord};

/// Why a run ended on the emergency path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    /// The watchdog fired before the pipeline finished.
    Watchdog,
    /// A phase failed and fallback was enabled.
    Failed(StartupError),
}

/// How a coordination run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Every phase succeeded.
    Completed {
        /// Total run time in milliseconds.
        duration_ms: u64,
    },
    /// The emergency fallback left the application renderable.
    EmergencyFallback {
        /// What triggered the fallback.
        cause: FallbackCause,
    },
}

impl StartupOutcome {
    /// Whether the full pipeline succeeded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Whether the run ended on the emergency path.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::EmergencyFallback { .. })
    }
}

/// Snapshot of the coordinator, as reported by `status()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct CoordinatorStatus {
    /// Current state.
    pub state: CoordinationState,
    /// Phase currently executing.
    pub current_phase: Option<PhaseName>,
    /// Set once rendering is unblocked after data loading.
    pub data_loading_complete: bool,
    /// Set once `TEMPLATE_PRELOAD` finished (successfully or not).
    pub template_preload_complete: bool,
    /// Set once the required systems were seen.
    pub systems_ready: bool,
    /// Whether rendering is blocked.
    pub rendering_blocked: bool,
    /// Outstanding operation counts.
    pub pending_operations: PendingOperations,
    /// Operations waiting for the deferred phase.
    pub deferred_operations: usize,
    /// Phase log of the current or last run.
    pub phases: Vec<PhaseRecord>,
    /// Milliseconds since the current or last run started.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}
