//! Coordinator tuning and per-run options.

use std::time::Duration;

use crate::collaborators::DEFAULT_CRITICAL_TEMPLATES;
use crate::systems::DEFAULT_REQUIRED_SYSTEMS;

/// Default `SYSTEMS_READY` timeout.
pub const DEFAULT_SYSTEMS_READY_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default `SYSTEMS_READY` poll interval.
pub const DEFAULT_SYSTEMS_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Default upper bound between pending-operation checks.
pub const DEFAULT_PENDING_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default watchdog for a whole run.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(30_000);
/// Default `PENDING_OPERATIONS` wait.
pub const DEFAULT_MAX_WAIT_TIME: Duration = Duration::from_millis(15_000);

/// Coordinator-level configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long `SYSTEMS_READY` waits for the required systems.
    pub systems_ready_timeout: Duration,
    /// Poll interval while waiting for systems.
    pub systems_poll_interval: Duration,
    /// Upper bound between pending-operation checks when no change is signalled.
    pub pending_poll_interval: Duration,
    /// Watchdog bounding a whole run.
    pub watchdog_timeout: Duration,
    /// Systems that must be registered before startup proceeds.
    pub required_systems: Vec<String>,
    /// Templates requested from the preloader.
    pub critical_templates: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            systems_ready_timeout: DEFAULT_SYSTEMS_READY_TIMEOUT,
            systems_poll_interval: DEFAULT_SYSTEMS_POLL_INTERVAL,
            pending_poll_interval: DEFAULT_PENDING_POLL_INTERVAL,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
            required_systems: DEFAULT_REQUIRED_SYSTEMS
                .iter()
                .map(ToString::to_string)
                .collect(),
            critical_templates: DEFAULT_CRITICAL_TEMPLATES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Options for one `coordinate_startup` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StartupOptions {
    /// Run `MKCG_HYDRATION`.
    pub enable_hydration: bool,
    /// Run `TEMPLATE_PRELOAD`.
    pub preload_templates: bool,
    /// Upper bound on `PENDING_OPERATIONS`.
    pub max_wait_time: Duration,
    /// On failure, run the emergency fallback instead of returning the error.
    pub emergency_fallback: bool,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            enable_hydration: true,
            preload_templates: true,
            max_wait_time: DEFAULT_MAX_WAIT_TIME,
            emergency_fallback: true,
        }
    }
}

impl StartupOptions {
    /// Skip hydration.
    #[must_use]
    pub fn without_hydration(mut self) -> Self {
        self.enable_hydration = false;
        self
    }

    /// Skip template preloading.
    #[must_use]
    pub fn without_preload(mut self) -> Self {
        self.preload_templates = false;
        self
    }

    /// Surface failures to the caller instead of falling back.
    #[must_use]
    pub fn without_fallback(mut self) -> Self {
        self.emergency_fallback = false;
        self
    }

    /// Set the pending-operations wait.
    #[must_use]
    pub fn with_max_wait_time(mut self, max_wait_time: Duration) -> Self {
        self.max_wait_time = max_wait_time;
        self
    }
}
