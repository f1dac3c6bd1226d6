//! Test fixtures for the bus and the coordinator.

use std::time::Duration;

use gmkb_events::{EventBus, EventBusConfig};
use gmkb_startup::{CoordinatorConfig, DEFAULT_REQUIRED_SYSTEMS, StartupOptions, SystemRegistry};

/// A bus that dispatches immediately instead of queuing until ready.
#[must_use]
pub fn test_bus() -> EventBus {
    EventBus::with_config(EventBusConfig {
        start_ready: true,
        ..EventBusConfig::default()
    })
}

/// A bus still in its pre-ready state.
#[must_use]
pub fn test_unready_bus() -> EventBus {
    EventBus::new()
}

/// A registry with every default required system registered.
#[must_use]
pub fn test_systems() -> SystemRegistry {
    SystemRegistry::with_systems(DEFAULT_REQUIRED_SYSTEMS)
}

/// Coordinator config with short timeouts, for tests that exercise failure
/// paths without advancing the clock by seconds.
#[must_use]
pub fn test_coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        systems_ready_timeout: Duration::from_millis(200),
        systems_poll_interval: Duration::from_millis(10),
        pending_poll_interval: Duration::from_millis(10),
        watchdog_timeout: Duration::from_secs(2),
        ..CoordinatorConfig::default()
    }
}

/// Default startup options with a short pending-operation wait.
#[must_use]
pub fn test_startup_options() -> StartupOptions {
    StartupOptions {
        max_wait_time: Duration::from_millis(500),
        ..StartupOptions::default()
    }
}

/// Install a test-writer tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures() {
        assert!(test_bus().is_ready());
        assert!(!test_unready_bus().is_ready());
        assert!(test_systems().missing(&CoordinatorConfig::default().required_systems).is_empty());
        assert!(test_coordinator_config().watchdog_timeout < CoordinatorConfig::default().watchdog_timeout);
        init_test_logging();
        init_test_logging();
    }
}
