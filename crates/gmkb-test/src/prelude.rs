//! Prelude for test code.
//!
//! ```rust,ignore
//! use gmkb_test::prelude::*;
//! ```

pub use crate::fixtures::{
    init_test_logging, test_bus, test_coordinator_config, test_startup_options, test_systems,
    test_unready_bus,
};
pub use crate::mocks::{MockBehavior, MockHydrator, MockPreloader};
pub use crate::recorder::{EventRecorder, RecordedEvent};
