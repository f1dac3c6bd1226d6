//! Per-emission envelope and emit options.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Envelope handed to listeners for a single emission.
///
/// A fresh envelope is built for every dispatch and discarded afterwards.
/// Listeners receive it mutably so they can call [`Envelope::prevent_default`]
/// or [`Envelope::stop_propagation`].
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Event name the envelope was emitted under.
    pub event_type: String,
    /// Emission payload.
    pub data: Value,
    /// Wall-clock time the envelope was built.
    pub timestamp: DateTime<Utc>,
    /// `true` when the envelope is a replay of a buffered emission.
    pub replayed: bool,
    cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Envelope {
    /// Build a new envelope.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: Value, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
            replayed: false,
            cancelable,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub(crate) fn replay(event_type: &str, data: Value) -> Self {
        Self {
            replayed: true,
            ..Self::new(event_type, data, true)
        }
    }

    /// Mark the emission as rejected. No-op unless the emission is cancelable.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Halt dispatch to the remaining listeners of this emission.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener rejected the emission.
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Whether a listener halted dispatch.
    #[must_use]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Whether `prevent_default` has any effect on this envelope.
    #[must_use]
    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }
}

/// Options controlling how [`EventBus::emit`](crate::EventBus::emit) routes an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct EmitOptions {
    /// Allow listeners to reject the emission via `prevent_default`.
    pub cancelable: bool,
    /// Buffer the emission for replay when no listener exists.
    pub replayable: bool,
    /// Queue the emission when the bus is not ready yet.
    pub queueable: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            cancelable: true,
            replayable: true,
            queueable: true,
        }
    }
}

impl EmitOptions {
    /// Disable queuing before the ready signal.
    #[must_use]
    pub fn not_queueable(mut self) -> Self {
        self.queueable = false;
        self
    }

    /// Disable replay buffering.
    #[must_use]
    pub fn not_replayable(mut self) -> Self {
        self.replayable = false;
        self
    }

    /// Make `prevent_default` a no-op for this emission.
    #[must_use]
    pub fn not_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prevent_default_respects_cancelable() {
        let mut env = Envelope::new("x", json!({}), true);
        env.prevent_default();
        assert!(env.default_prevented());

        let mut env = Envelope::new("x", json!({}), false);
        env.prevent_default();
        assert!(!env.default_prevented());
    }

    #[test]
    fn test_stop_propagation() {
        let mut env = Envelope::new("x", json!(null), true);
        assert!(!env.propagation_stopped());
        env.stop_propagation();
        assert!(env.propagation_stopped());
    }

    #[test]
    fn test_replay_envelope_is_flagged() {
        let env = Envelope::replay("y", json!({"a": 1}));
        assert!(env.replayed);
        assert_eq!(env.event_type, "y");
        assert_eq!(env.data["a"], 1);
    }

    #[test]
    fn test_emit_options_builders() {
        let opts = EmitOptions::default();
        assert!(opts.cancelable && opts.replayable && opts.queueable);

        let opts = EmitOptions::default().not_queueable().not_replayable();
        assert!(!opts.queueable);
        assert!(!opts.replayable);
        assert!(opts.cancelable);
    }
}
