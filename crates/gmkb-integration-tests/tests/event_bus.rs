//! Integration tests for event bus delivery: priority order, the startup
//! queue, replay buffering and one-shot listeners.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gmkb_events::{EmitOptions, EventError, ListenerOptions, Priority};
use gmkb_test::{EventRecorder, test_bus, test_unready_bus};
use serde_json::json;

#[test]
fn critical_listener_receives_payload_once() {
    let bus = test_bus();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&calls);
    bus.on(
        "x",
        move |env| {
            c.lock().unwrap().push(env.data.clone());
            Ok(())
        },
        ListenerOptions::with_priority(Priority::Critical),
    )
    .unwrap();

    assert!(bus.emit("x", json!({"a": 1}), EmitOptions::default()));
    assert_eq!(*calls.lock().unwrap(), [json!({"a": 1})]);
}

#[test]
fn priority_beats_registration_order() {
    let bus = test_bus();
    let order = Arc::new(Mutex::new(Vec::new()));
    for (label, priority) in [
        ("low", Priority::Low),
        ("normal", Priority::Normal),
        ("critical", Priority::Critical),
        ("high", Priority::High),
    ] {
        let o = Arc::clone(&order);
        bus.on(
            "ordered",
            move |_| {
                o.lock().unwrap().push(label);
                Ok(())
            },
            ListenerOptions::with_priority(priority),
        )
        .unwrap();
    }

    bus.emit("ordered", json!(null), EmitOptions::default());
    assert_eq!(*order.lock().unwrap(), ["critical", "high", "normal", "low"]);
}

#[test]
fn queued_before_ready_delivers_once_after_drain() {
    let bus = test_unready_bus();
    let recorder = EventRecorder::attach(&bus, &["y"]).unwrap();

    assert!(bus.emit("y", json!({}), EmitOptions::default()));
    assert_eq!(bus.queue_len(), 1);
    assert!(recorder.events().is_empty());

    assert_eq!(bus.mark_ready(), 1);
    assert_eq!(bus.queue_len(), 0);
    assert_eq!(recorder.count("y"), 1);

    assert_eq!(bus.mark_ready(), 0);
    assert_eq!(recorder.count("y"), 1);
}

#[test]
fn not_queueable_emission_bypasses_the_queue() {
    let bus = test_unready_bus();
    let recorder = EventRecorder::attach(&bus, &["now"]).unwrap();

    bus.emit("now", json!(1), EmitOptions::default().not_queueable());
    assert_eq!(bus.queue_len(), 0);
    assert_eq!(recorder.count("now"), 1);
}

#[test]
fn failing_listener_does_not_stop_delivery() {
    let bus = test_bus();
    bus.on(
        "fragile",
        |_| Err("boom".into()),
        ListenerOptions::with_priority(Priority::High),
    )
    .unwrap();
    bus.on(
        "fragile",
        |_| panic!("listener panic"),
        ListenerOptions::default(),
    )
    .unwrap();
    let recorder = EventRecorder::attach(&bus, &["fragile"]).unwrap();

    assert!(bus.emit("fragile", json!(7), EmitOptions::default()));
    assert_eq!(recorder.payloads("fragile"), [json!(7)]);
}

#[test]
fn prevent_default_reports_false() {
    let bus = test_bus();
    bus.on(
        "save",
        |env| {
            env.prevent_default();
            Ok(())
        },
        ListenerOptions::default(),
    )
    .unwrap();

    assert!(!bus.emit("save", json!(null), EmitOptions::default()));
    assert!(bus.emit("save", json!(null), EmitOptions::default().not_cancelable()));
}

#[tokio::test(start_paused = true)]
async fn replay_within_window_delivers_buffered_payload() {
    let bus = test_bus();
    assert!(!bus.emit("late", json!({"id": 42}), EmitOptions::default()));

    tokio::time::advance(Duration::from_secs(1)).await;
    let recorder = EventRecorder::attach(&bus, &["late"]).unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, json!({"id": 42}));
    assert!(events[0].replayed);
    assert_eq!(bus.replay_len("late"), 0);

    let second = EventRecorder::attach(&bus, &["late"]).unwrap();
    assert!(second.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_replay_entry_is_never_delivered() {
    let bus = test_bus();
    bus.emit("stale", json!(1), EmitOptions::default());

    tokio::time::advance(bus.config().replay_timeout + Duration::from_millis(1)).await;
    let recorder = EventRecorder::attach(&bus, &["stale"]).unwrap();
    assert!(recorder.events().is_empty());
}

#[test]
fn once_listener_fires_exactly_once() {
    let bus = test_bus();
    let hits = Arc::new(Mutex::new(0_u32));
    let h = Arc::clone(&hits);
    bus.once(
        "tick",
        move |_| {
            *h.lock().unwrap() += 1;
            Ok(())
        },
        ListenerOptions::default(),
    )
    .unwrap();

    for _ in 0..3 {
        bus.emit("tick", json!(null), EmitOptions::default());
    }
    assert_eq!(*hits.lock().unwrap(), 1);
    assert_eq!(bus.listener_count("tick"), 0);
}

#[test]
fn invalid_names_are_rejected() {
    let bus = test_bus();
    let err = bus
        .on("", |_| Ok(()), ListenerOptions::default())
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidArgument(_)));
}

#[tokio::test(start_paused = true)]
async fn wait_for_resolves_and_times_out() {
    let bus = test_bus();
    let emitter = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        emitter.emit("loaded", json!({"ok": true}), EmitOptions::default());
    });

    let env = bus
        .wait_for("loaded", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(env.data, json!({"ok": true}));

    let err = bus
        .wait_for("never", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, EventError::Timeout { .. }));
    assert_eq!(bus.listener_count("never"), 0);
}

#[test]
fn namespace_prefixes_event_names() {
    let bus = test_bus();
    let recorder = EventRecorder::attach(&bus, &["builder:saved"]).unwrap();
    bus.namespace("builder")
        .emit("saved", json!(1), EmitOptions::default());
    assert_eq!(recorder.count("builder:saved"), 1);
}

#[tokio::test]
async fn emit_async_skips_listeners_added_after_the_call() {
    let bus = test_bus();
    let early = EventRecorder::attach(&bus, &["deferred"]).unwrap();

    let pending = bus.emit_async("deferred", json!(3), EmitOptions::default());
    let late = EventRecorder::attach(&bus, &["deferred"]).unwrap();
    assert!(early.events().is_empty());

    assert!(pending.await);
    assert_eq!(early.payloads("deferred"), [json!(3)]);
    assert!(late.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unheard_emissions_expire_from_the_replay_buffer() {
    let bus = test_bus();
    for i in 0..10_000 {
        bus.emit("unheard", json!(i), EmitOptions::default());
    }

    tokio::time::advance(Duration::from_secs(60)).await;
    bus.emit("unheard", json!("last"), EmitOptions::default());
    assert_eq!(bus.stats().replay_size, 1);
}
