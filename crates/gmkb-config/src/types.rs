//! Configuration types for the GMKB startup core.
//!
//! These types carry no dependency on the runtime crates. Durations are
//! plain millisecond integers here and are converted at the runtime
//! boundary. Every struct implements [`Default`] with the same values as the
//! embedded `defaults.toml`, so a bare `[section]` header in TOML produces a
//! working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event bus buffering and history.
    pub events: EventsSection,
    /// Startup coordinator timing, collaborators and run options.
    pub startup: StartupSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// EventsSection
// ---------------------------------------------------------------------------

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// How long listener-less emissions stay replayable.
    pub replay_timeout_ms: u64,
    /// Queued emissions older than this are dropped when the bus becomes ready.
    pub queue_max_age_ms: u64,
    /// Number of history entries kept. `0` disables history.
    pub history_limit: usize,
    /// Default timeout for `wait_for`.
    pub wait_for_timeout_ms: u64,
    /// Whether the bus starts out ready.
    pub start_ready: bool,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            replay_timeout_ms: 5000,
            queue_max_age_ms: 10_000,
            history_limit: 100,
            wait_for_timeout_ms: 5000,
            start_ready: false,
        }
    }
}

// ---------------------------------------------------------------------------
// StartupSection
// ---------------------------------------------------------------------------

/// Startup coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct StartupSection {
    /// How long to wait for the required systems.
    pub systems_ready_timeout_ms: u64,
    /// Poll interval while waiting for systems.
    pub systems_poll_interval_ms: u64,
    /// Upper bound on the pending-operations wait.
    pub pending_operations_timeout_ms: u64,
    /// Upper bound between pending-operation checks.
    pub pending_poll_interval_ms: u64,
    /// Watchdog bounding a whole run.
    pub watchdog_timeout_ms: u64,
    /// Systems that must be registered before startup proceeds.
    pub required_systems: Vec<String>,
    /// Templates requested from the preloader.
    pub critical_templates: Vec<String>,
    /// Run hydration.
    pub enable_hydration: bool,
    /// Run template preloading.
    pub preload_templates: bool,
    /// Fall back to a renderable state instead of surfacing failures.
    pub emergency_fallback: bool,
}

impl Default for StartupSection {
    fn default() -> Self {
        Self {
            systems_ready_timeout_ms: 5000,
            systems_poll_interval_ms: 50,
            pending_operations_timeout_ms: 15_000,
            pending_poll_interval_ms: 100,
            watchdog_timeout_ms: 30_000,
            required_systems: ["state_manager", "component_manager", "renderer"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            critical_templates: ["hero", "topics", "biography", "authority-hook"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            enable_hydration: true,
            preload_templates: true,
            emergency_fallback: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["gmkb_events=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
