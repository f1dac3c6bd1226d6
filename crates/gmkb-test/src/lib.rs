//! GMKB Test - Shared test utilities for the GMKB startup core.
//!
//! Mock collaborators, an event recorder and fixtures used as a
//! dev-dependency by the runtime and the integration tests.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gmkb_startup::StartupCoordinator;
//! use gmkb_test::{MockHydrator, test_bus, test_systems};
//!
//! #[tokio::test(start_paused = true)]
//! async fn hydrates_once() {
//!     let hydrator = Arc::new(MockHydrator::new());
//!     let coordinator = StartupCoordinator::builder(test_bus())
//!         .with_systems(test_systems())
//!         .with_hydrator(hydrator.clone())
//!         .build()
//!         .unwrap();
//!
//!     coordinator.coordinate_startup(Default::default()).await.unwrap();
//!     assert_eq!(hydrator.initialize_calls(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;
pub mod recorder;

pub use fixtures::*;
pub use mocks::*;
pub use recorder::*;
