//! Runtime error types.

use thiserror::Error;

/// Errors that can occur while building or booting the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] gmkb_config::ConfigError),

    /// Logging could not be set up.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] gmkb_telemetry::TelemetryError),

    /// Startup coordination failed.
    #[error("Startup error: {0}")]
    Startup(#[from] gmkb_startup::StartupError),

    /// A default runtime was already installed.
    #[error("A default runtime is already installed")]
    AlreadyInstalled,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
