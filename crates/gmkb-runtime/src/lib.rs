//! GMKB Runtime - Assembles the startup core from configuration.
//!
//! This crate provides:
//! - A bridge from [`gmkb_config::Config`] to bus, coordinator and logging types
//! - A [`Runtime`] owning the shared bus and the startup coordinator
//! - A boot sequence: mark the bus ready, then coordinate startup
//! - An optional process-wide default instance
//!
//! # Example
//!
//! ```rust,no_run
//! use gmkb_config::Config;
//! use gmkb_runtime::{Runtime, config_bridge};
//!
//! # async fn example() -> Result<(), gmkb_runtime::RuntimeError> {
//! let config = Config::load(None)?;
//! gmkb_telemetry::setup_logging(&config_bridge::to_log_config(&config))?;
//!
//! let runtime = Runtime::from_config(config)?;
//! for system in ["state_manager", "component_manager", "renderer"] {
//!     runtime.register_system(system);
//! }
//! let outcome = runtime.boot().await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod error;
mod global;
mod runtime;

pub use error::{RuntimeError, RuntimeResult};
pub use global::{default_runtime, install_default};
pub use runtime::{Runtime, RuntimeBuilder};
