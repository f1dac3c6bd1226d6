//! Prelude module - commonly used types for convenient import.
//!
//! Use `use gmkb_runtime::prelude::*;` to import all essential types.

// Runtime
pub use crate::{Runtime, RuntimeBuilder, default_runtime, install_default};

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Config bridge
pub use crate::config_bridge::{
    to_coordinator_config, to_event_bus_config, to_log_config, to_startup_options,
};
