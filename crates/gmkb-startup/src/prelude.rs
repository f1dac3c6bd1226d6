//! Prelude module - commonly used types for convenient import.
//!
//! Use `use gmkb_startup::prelude::*;` to import all essential types.

// Coordinator
pub use crate::{
    CoordinatorConfig, StartupCoordinator, StartupCoordinatorBuilder, StartupOptions,
    SystemRegistry,
};

// Collaborators
pub use crate::{StateHydrator, TemplatePreloader};

// Deferred work
pub use crate::{DeferredHandle, DeferredOperation, OperationToken, infallible};

// State and outcomes
pub use crate::{
    CoordinationState, CoordinatorStatus, FallbackCause, PhaseName, StartupOutcome,
};

// Errors
pub use crate::{CollaboratorError, CollaboratorResult, DeferredError, StartupError, StartupResult};
