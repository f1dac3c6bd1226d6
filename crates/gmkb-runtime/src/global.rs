//! Process-wide default runtime.
//!
//! Components that cannot be handed a [`Runtime`] explicitly look it up
//! here. Nothing is created implicitly: the application installs the
//! instance once during setup.

use std::sync::OnceLock;

use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::Runtime;

static DEFAULT_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Install `runtime` as the process-wide default.
///
/// # Errors
///
/// Returns [`RuntimeError::AlreadyInstalled`] if a default exists.
pub fn install_default(runtime: Runtime) -> RuntimeResult<&'static Runtime> {
    DEFAULT_RUNTIME
        .set(runtime)
        .map_err(|_| RuntimeError::AlreadyInstalled)?;
    debug!("Default runtime installed");
    default_runtime().ok_or(RuntimeError::AlreadyInstalled)
}

/// The process-wide default, if installed.
#[must_use]
pub fn default_runtime() -> Option<&'static Runtime> {
    DEFAULT_RUNTIME.get()
}
