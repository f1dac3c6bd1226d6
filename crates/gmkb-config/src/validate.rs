//! Post-load configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully loaded configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_events(config)?;
    validate_startup(config)?;
    validate_logging(config)?;
    Ok(())
}

/// Largest accepted history size.
const MAX_HISTORY_LIMIT: usize = 10_000;

/// Largest accepted duration (one hour).
const MAX_DURATION_MS: u64 = 3_600_000;

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn check_duration(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 || value > MAX_DURATION_MS {
        return Err(invalid(
            field,
            format!("{value} ms is out of range; must be between 1 and {MAX_DURATION_MS}"),
        ));
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    let e = &config.events;
    check_duration("events.replay_timeout_ms", e.replay_timeout_ms)?;
    check_duration("events.queue_max_age_ms", e.queue_max_age_ms)?;
    check_duration("events.wait_for_timeout_ms", e.wait_for_timeout_ms)?;

    if e.history_limit > MAX_HISTORY_LIMIT {
        return Err(invalid(
            "events.history_limit",
            format!("history_limit must not exceed {MAX_HISTORY_LIMIT}"),
        ));
    }
    Ok(())
}

fn validate_startup(config: &Config) -> ConfigResult<()> {
    let s = &config.startup;
    check_duration("startup.systems_ready_timeout_ms", s.systems_ready_timeout_ms)?;
    check_duration("startup.systems_poll_interval_ms", s.systems_poll_interval_ms)?;
    check_duration(
        "startup.pending_operations_timeout_ms",
        s.pending_operations_timeout_ms,
    )?;
    check_duration("startup.pending_poll_interval_ms", s.pending_poll_interval_ms)?;
    check_duration("startup.watchdog_timeout_ms", s.watchdog_timeout_ms)?;

    if s.systems_poll_interval_ms > s.systems_ready_timeout_ms {
        return Err(invalid(
            "startup.systems_poll_interval_ms",
            format!(
                "poll interval ({}) must not exceed systems_ready_timeout_ms ({})",
                s.systems_poll_interval_ms, s.systems_ready_timeout_ms
            ),
        ));
    }

    if let Some(blank) = s.required_systems.iter().position(|n| n.trim().is_empty()) {
        return Err(invalid(
            "startup.required_systems",
            format!("entry {blank} is blank"),
        ));
    }

    if let Some(blank) = s.critical_templates.iter().position(|n| n.trim().is_empty()) {
        return Err(invalid(
            "startup.critical_templates",
            format!("entry {blank} is blank"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(
        l.format.to_ascii_lowercase().as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_watchdog_rejected() {
        let mut config = Config::default();
        config.startup.watchdog_timeout_ms = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "startup.watchdog_timeout_ms"
        );
    }

    #[test]
    fn test_poll_longer_than_timeout_rejected() {
        let mut config = Config::default();
        config.startup.systems_poll_interval_ms = 10_000;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "startup.systems_poll_interval_ms"
        );
    }

    #[test]
    fn test_blank_system_rejected() {
        let mut config = Config::default();
        config.startup.required_systems.push("  ".to_owned());
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "startup.required_systems"
        );
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");
    }

    #[test]
    fn test_history_limit_bound() {
        let mut config = Config::default();
        config.events.history_limit = 0;
        assert!(validate(&config).is_ok());
        config.events.history_limit = MAX_HISTORY_LIMIT + 1;
        assert_eq!(field_of(validate(&config).unwrap_err()), "events.history_limit");
    }
}
