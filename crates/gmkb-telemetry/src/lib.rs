//! GMKB Telemetry - Logging setup for the page builder startup core.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup with multiple formats and targets
//! - A boot context whose span ties together the logs of one startup
//!
//! # Example
//!
//! ```rust,no_run
//! use gmkb_telemetry::{BootContext, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), gmkb_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("gmkb_startup=debug");
//!
//! setup_logging(&config)?;
//!
//! let boot = BootContext::new("runtime");
//! let _guard = boot.span().entered();
//! tracing::info!("Booting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::BootContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
