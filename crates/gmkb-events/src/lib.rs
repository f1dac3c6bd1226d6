//! GMKB Events - Priority event bus for the page builder startup core.
//!
//! This crate provides:
//! - A synchronous publish/subscribe bus with priority-ordered listeners
//! - A startup queue holding emissions made before the host is ready
//! - A replay buffer delivering listener-less emissions to late subscribers
//! - Namespaced facades, emission statistics and bounded history
//!
//! # Architecture
//!
//! Every emission is routed one of three ways:
//!
//! 1. **Queued** when the bus has not received [`EventBus::mark_ready`] yet
//!    and the emission is queueable. The queue is drained once on ready.
//!
//! 2. **Buffered** for replay when no listener exists. The first listener
//!    registering within the replay window receives the buffered payloads.
//!
//! 3. **Dispatched** to a snapshot of the listener list, in ascending
//!    priority order, with listener failures isolated from the emitter.
//!
//! # Example
//!
//! ```rust
//! use gmkb_events::{EmitOptions, EventBus, ListenerOptions, Priority};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//!
//! // Emitted before ready: queued.
//! assert!(bus.emit("component:added", json!({"id": "hero-1"}), EmitOptions::default()));
//!
//! bus.on(
//!     "component:added",
//!     |env| {
//!         assert_eq!(env.data["id"], "hero-1");
//!         Ok(())
//!     },
//!     ListenerOptions::with_priority(Priority::High),
//! )
//! .unwrap();
//!
//! // Ready: the queued emission is delivered.
//! assert_eq!(bus.mark_ready(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod buffers;
mod bus;
mod envelope;
mod error;
mod listener;
mod namespace;
mod stats;

pub use bus::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_QUEUE_MAX_AGE, DEFAULT_REPLAY_TIMEOUT,
    DEFAULT_WAIT_FOR_TIMEOUT, EventBus, EventBusConfig, Subscription, WeakEventBus,
};
pub use envelope::{EmitOptions, Envelope};
pub use error::{EventError, EventResult, ListenerError, ListenerResult};
pub use listener::{Callback, ListenerKey, ListenerOptions, Priority};
pub use namespace::Namespace;
pub use stats::{BusStats, EventStats, HistoryEntry};
