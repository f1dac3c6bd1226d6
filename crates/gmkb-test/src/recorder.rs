//! Listener that records what the bus delivered.

use std::sync::{Arc, Mutex, PoisonError};

use gmkb_events::{EventBus, EventResult, ListenerOptions, Priority, Subscription};
use serde_json::Value;

/// One delivery observed by an [`EventRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name.
    pub event: String,
    /// Payload.
    pub data: Value,
    /// Whether the delivery came from the replay buffer.
    pub replayed: bool,
}

/// Records every delivery of the events it subscribed to, in order.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    subscriptions: Vec<Subscription>,
}

impl EventRecorder {
    /// Subscribe to each of `names` at [`Priority::Low`].
    ///
    /// # Errors
    ///
    /// Returns the bus error if a name is invalid.
    pub fn attach(bus: &EventBus, names: &[&str]) -> EventResult<Self> {
        Self::attach_with(bus, names, ListenerOptions::with_priority(Priority::Low))
    }

    /// Subscribe to each of `names` with `opts`.
    ///
    /// # Errors
    ///
    /// Returns the bus error if a name is invalid.
    pub fn attach_with(bus: &EventBus, names: &[&str], opts: ListenerOptions) -> EventResult<Self> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut subscriptions = Vec::with_capacity(names.len());
        for name in names {
            let sink = Arc::clone(&events);
            subscriptions.push(bus.on(
                name,
                move |env| {
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(RecordedEvent {
                            event: env.event_type.clone(),
                            data: env.data.clone(),
                            replayed: env.replayed,
                        });
                    Ok(())
                },
                opts.clone(),
            )?);
        }
        Ok(Self {
            events,
            subscriptions,
        })
    }

    /// Every delivery so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in delivery order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    /// Payloads delivered for `name`.
    #[must_use]
    pub fn payloads(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e.event == name)
            .map(|e| e.data)
            .collect()
    }

    /// Number of deliveries for `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.event == name).count()
    }

    /// Forget recorded deliveries.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Unsubscribe from the bus. Recorded deliveries are kept.
    pub fn detach(&self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmkb_events::{EmitOptions, EventBusConfig};
    use serde_json::json;

    #[test]
    fn test_records_in_order() {
        let bus = EventBus::with_config(EventBusConfig {
            start_ready: true,
            ..EventBusConfig::default()
        });
        let recorder = EventRecorder::attach(&bus, &["a", "b"]).unwrap();

        bus.emit("b", json!(1), EmitOptions::default());
        bus.emit("a", json!(2), EmitOptions::default());
        bus.emit("c", json!(3), EmitOptions::default());

        assert_eq!(recorder.names(), ["b", "a"]);
        assert_eq!(recorder.payloads("a"), [json!(2)]);
        assert_eq!(recorder.count("c"), 0);

        recorder.detach();
        bus.emit("a", json!(4), EmitOptions::default());
        assert_eq!(recorder.count("a"), 1);

        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_marks_replayed_deliveries() {
        let bus = EventBus::with_config(EventBusConfig {
            start_ready: true,
            ..EventBusConfig::default()
        });
        bus.emit("late", json!({"v": 1}), EmitOptions::default());

        let recorder = EventRecorder::attach(&bus, &["late"]).unwrap();
        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].replayed);
    }
}
