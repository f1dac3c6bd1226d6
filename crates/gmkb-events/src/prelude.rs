//! Prelude module - commonly used types for convenient import.
//!
//! Use `use gmkb_events::prelude::*;` to import all essential types.

// Event bus
pub use crate::{EventBus, EventBusConfig, Namespace, Subscription, WeakEventBus};

// Emission
pub use crate::{EmitOptions, Envelope};

// Listeners
pub use crate::{Callback, ListenerKey, ListenerOptions, Priority};

// Errors
pub use crate::{EventError, EventResult, ListenerError, ListenerResult};

// Statistics
pub use crate::{BusStats, EventStats, HistoryEntry};
