//! Replay buffer and pre-ready startup queue.
//!
//! Both hold emissions that could not be dispatched at the time they were
//! made. Timestamps use `tokio::time::Instant` so expiry follows the runtime
//! clock (and a paused clock in tests).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::envelope::EmitOptions;

/// An emission buffered because it had no listener.
#[derive(Debug, Clone)]
pub(crate) struct ReplayEntry {
    pub(crate) data: Value,
    pub(crate) buffered_at: Instant,
}

impl ReplayEntry {
    fn is_live(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.buffered_at) < ttl
    }
}

/// Per-event replay buffers. Expired entries are dropped on every push, so
/// the buffer never holds more than one replay window of emissions.
#[derive(Debug, Default)]
pub(crate) struct ReplayBuffer {
    entries: HashMap<String, Vec<ReplayEntry>>,
}

impl ReplayBuffer {
    pub(crate) fn push(&mut self, name: &str, data: Value, ttl: Duration) {
        self.prune(ttl);
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(ReplayEntry {
                data,
                buffered_at: Instant::now(),
            });
    }

    /// Remove the buffer for `name` and return its live payloads in arrival order.
    pub(crate) fn take(&mut self, name: &str, ttl: Duration) -> Vec<Value> {
        let Some(entries) = self.entries.remove(name) else {
            return Vec::new();
        };
        let now = Instant::now();
        entries
            .into_iter()
            .filter(|e| e.is_live(ttl, now))
            .map(|e| e.data)
            .collect()
    }

    /// Drop expired entries, returning how many were removed.
    ///
    /// Each per-event buffer is in arrival order, so expired entries form a
    /// prefix.
    pub(crate) fn prune(&mut self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut removed: usize = 0;
        self.entries.retain(|_, entries| {
            let expired = entries.partition_point(|e| !e.is_live(ttl, now));
            entries.drain(..expired);
            removed = removed.saturating_add(expired);
            !entries.is_empty()
        });
        removed
    }

    pub(crate) fn len(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, Vec::len)
    }

    pub(crate) fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// An emission made before the bus was ready.
#[derive(Debug, Clone)]
pub(crate) struct QueuedEmission {
    pub(crate) name: String,
    pub(crate) data: Value,
    pub(crate) options: EmitOptions,
    pub(crate) queued_at: Instant,
}

impl QueuedEmission {
    pub(crate) fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.queued_at)
    }
}

/// FIFO of emissions waiting for the ready signal.
#[derive(Debug, Default)]
pub(crate) struct StartupQueue {
    entries: VecDeque<QueuedEmission>,
}

impl StartupQueue {
    pub(crate) fn push(&mut self, name: &str, data: Value, options: EmitOptions) {
        self.entries.push_back(QueuedEmission {
            name: name.to_string(),
            data,
            options,
            queued_at: Instant::now(),
        });
    }

    pub(crate) fn drain(&mut self) -> Vec<QueuedEmission> {
        self.entries.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_millis(5000);

    #[tokio::test(start_paused = true)]
    async fn test_replay_take_returns_live_entries_in_order() {
        let mut buf = ReplayBuffer::default();
        buf.push("a", json!(1), TTL);
        buf.push("a", json!(2), TTL);
        assert_eq!(buf.len("a"), 2);

        let taken = buf.take("a", TTL);
        assert_eq!(taken, vec![json!(1), json!(2)]);
        assert_eq!(buf.len("a"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_take_skips_expired() {
        let mut buf = ReplayBuffer::default();
        buf.push("a", json!("old"), TTL);
        tokio::time::advance(Duration::from_millis(4000)).await;
        buf.push("a", json!("new"), TTL);
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(buf.take("a", TTL), vec![json!("new")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_prune() {
        let mut buf = ReplayBuffer::default();
        buf.push("a", json!(1), TTL);
        tokio::time::advance(Duration::from_millis(3000)).await;
        buf.push("b", json!(2), TTL);
        tokio::time::advance(Duration::from_millis(3000)).await;

        assert_eq!(buf.prune(TTL), 1);
        assert_eq!(buf.len("a"), 0);
        assert_eq!(buf.len("b"), 1);
        assert_eq!(buf.total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_drops_expired_entries_of_every_event() {
        let mut buf = ReplayBuffer::default();
        for i in 0..100 {
            buf.push("a", json!(i), TTL);
        }
        buf.push("b", json!("old"), TTL);
        tokio::time::advance(TTL).await;

        buf.push("c", json!("fresh"), TTL);
        assert_eq!(buf.len("a"), 0);
        assert_eq!(buf.len("b"), 0);
        assert_eq!(buf.total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_drain_is_fifo() {
        let mut queue = StartupQueue::default();
        queue.push("x", json!(1), EmitOptions::default());
        queue.push("y", json!(2), EmitOptions::default());
        tokio::time::advance(Duration::from_millis(250)).await;

        let drained = queue.drain();
        assert_eq!(queue.len(), 0);
        let names: Vec<_> = drained.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(drained[0].age(), Duration::from_millis(250));
    }
}
