//! GMKB Startup - Phased startup coordination for the page builder.
//!
//! This crate provides:
//! - A [`StartupCoordinator`] running an ordered phase pipeline
//! - Rendering gating with deferred operations released after data loading
//! - Pending-operation accounting driven by collaborator lifecycle events
//! - A watchdog and an emergency fallback that always leave the app renderable
//!
//! # Phases
//!
//! A run executes, in order:
//!
//! 1. `SYSTEMS_READY` - waits for the required systems in the [`SystemRegistry`]
//! 2. `TEMPLATE_PRELOAD` - warms critical templates; failures are tolerated
//! 3. `MKCG_HYDRATION` - hydrates state with rendering blocked
//! 4. `PENDING_OPERATIONS` - waits for template and state operations to drain
//! 5. `DEFERRED_OPERATIONS` - runs work deferred while rendering was blocked
//! 6. `VALIDATION` - checks the final invariants
//!
//! The coordinator talks to the rest of the application only through the
//! [`gmkb_events::EventBus`] and the [`TemplatePreloader`] and
//! [`StateHydrator`] traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use gmkb_events::{EventBus, EventBusConfig};
//! use gmkb_startup::{StartupCoordinator, StartupOptions, SystemRegistry};
//!
//! # async fn run() -> Result<(), gmkb_startup::StartupError> {
//! let bus = EventBus::with_config(EventBusConfig {
//!     start_ready: true,
//!     ..EventBusConfig::default()
//! });
//! let systems = SystemRegistry::with_systems(["state_manager", "component_manager", "renderer"]);
//! let coordinator = StartupCoordinator::builder(bus).with_systems(systems).build()?;
//!
//! let outcome = coordinator.coordinate_startup(StartupOptions::default()).await?;
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod events;
pub mod prelude;

mod collaborators;
mod config;
mod coordinator;
mod deferred;
mod error;
mod operations;
mod phase;
mod status;
mod systems;

pub use collaborators::{DEFAULT_CRITICAL_TEMPLATES, StateHydrator, TemplatePreloader};
pub use config::{
    CoordinatorConfig, DEFAULT_MAX_WAIT_TIME, DEFAULT_PENDING_POLL_INTERVAL,
    DEFAULT_SYSTEMS_POLL_INTERVAL, DEFAULT_SYSTEMS_READY_TIMEOUT, DEFAULT_WATCHDOG_TIMEOUT,
    StartupOptions,
};
pub use coordinator::{StartupCoordinator, StartupCoordinatorBuilder};
pub use deferred::{DeferredFuture, DeferredHandle, DeferredOperation, infallible};
pub use error::{
    CollaboratorError, CollaboratorResult, DeferredError, StartupError, StartupResult,
};
pub use operations::{OperationKind, OperationToken, PendingOperations};
pub use phase::{CoordinationState, PhaseName, PhaseRecord};
pub use status::{CoordinatorStatus, FallbackCause, StartupOutcome};
pub use systems::{DEFAULT_REQUIRED_SYSTEMS, SystemRegistry};
