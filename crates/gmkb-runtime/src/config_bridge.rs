//! Bridge from `gmkb_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. These
//! functions translate its millisecond fields and string enums into the
//! types the bus, the coordinator and the logging setup take.

use std::time::Duration;

use gmkb_config::Config;
use gmkb_events::EventBusConfig;
use gmkb_startup::{CoordinatorConfig, StartupOptions};
use gmkb_telemetry::{LogConfig, LogFormat};

/// Convert config to [`EventBusConfig`].
#[must_use]
pub fn to_event_bus_config(cfg: &Config) -> EventBusConfig {
    let e = &cfg.events;
    EventBusConfig {
        replay_timeout: Duration::from_millis(e.replay_timeout_ms),
        queue_max_age: Duration::from_millis(e.queue_max_age_ms),
        history_limit: e.history_limit,
        wait_for_timeout: Duration::from_millis(e.wait_for_timeout_ms),
        start_ready: e.start_ready,
    }
}

/// Convert config to [`CoordinatorConfig`].
#[must_use]
pub fn to_coordinator_config(cfg: &Config) -> CoordinatorConfig {
    let s = &cfg.startup;
    CoordinatorConfig {
        systems_ready_timeout: Duration::from_millis(s.systems_ready_timeout_ms),
        systems_poll_interval: Duration::from_millis(s.systems_poll_interval_ms),
        pending_poll_interval: Duration::from_millis(s.pending_poll_interval_ms),
        watchdog_timeout: Duration::from_millis(s.watchdog_timeout_ms),
        required_systems: s.required_systems.clone(),
        critical_templates: s.critical_templates.clone(),
    }
}

/// Convert config to the [`StartupOptions`] used by `boot`.
#[must_use]
pub fn to_startup_options(cfg: &Config) -> StartupOptions {
    let s = &cfg.startup;
    StartupOptions {
        enable_hydration: s.enable_hydration,
        preload_templates: s.preload_templates,
        max_wait_time: Duration::from_millis(s.pending_operations_timeout_ms),
        emergency_fallback: s.emergency_fallback,
    }
}

/// Convert config to [`LogConfig`].
///
/// Unknown format names fall back to compact; `Config` validation already
/// rejects them on load.
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}
