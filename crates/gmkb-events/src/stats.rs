//! Emission statistics and bounded history.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Per-event emission counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStats {
    /// Number of `emit` calls for the event.
    pub count: u64,
    /// First emission.
    pub first_emitted: DateTime<Utc>,
    /// Most recent emission.
    pub last_emitted: DateTime<Utc>,
    /// Listeners currently registered for the event.
    pub listeners: usize,
}

/// One entry of the emission history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Event name.
    pub event: String,
    /// Payload as emitted.
    pub data: Value,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot returned by [`EventBus::stats`](crate::EventBus::stats).
#[derive(Debug, Clone, Serialize)]
pub struct BusStats {
    /// Whether the ready signal has been received.
    pub ready: bool,
    /// Number of distinct events ever emitted.
    pub total_events: usize,
    /// Listeners across all events.
    pub total_listeners: usize,
    /// Emissions waiting in the startup queue.
    pub queue_size: usize,
    /// Entries waiting in replay buffers (including not yet pruned ones).
    pub replay_size: usize,
    /// Per-event counters.
    pub events: BTreeMap<String, EventStats>,
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct StatsTracker {
    counters: HashMap<String, Counter>,
    history: VecDeque<HistoryEntry>,
    history_limit: usize,
}

impl StatsTracker {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            counters: HashMap::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    pub(crate) fn record(&mut self, name: &str, data: &Value) {
        let now = Utc::now();
        self.counters
            .entry(name.to_string())
            .and_modify(|c| {
                c.count = c.count.saturating_add(1);
                c.last = now;
            })
            .or_insert(Counter {
                count: 1,
                first: now,
                last: now,
            });

        if self.history_limit == 0 {
            return;
        }
        if self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            event: name.to_string(),
            data: data.clone(),
            timestamp: now,
        });
    }

    pub(crate) fn history(&self) -> Vec<HistoryEntry> {
        self.history.iter().cloned().collect()
    }

    pub(crate) fn event_stats(
        &self,
        listener_count: impl Fn(&str) -> usize,
    ) -> BTreeMap<String, EventStats> {
        self.counters
            .iter()
            .map(|(name, c)| {
                (
                    name.clone(),
                    EventStats {
                        count: c.count,
                        first_emitted: c.first,
                        last_emitted: c.last,
                        listeners: listener_count(name),
                    },
                )
            })
            .collect()
    }

    pub(crate) fn distinct_events(&self) -> usize {
        self.counters.len()
    }

    pub(crate) fn clear(&mut self) {
        self.counters.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_counts_per_event() {
        let mut stats = StatsTracker::new(10);
        stats.record("a", &json!(1));
        stats.record("a", &json!(2));
        stats.record("b", &json!(null));

        let events = stats.event_stats(|_| 0);
        assert_eq!(events["a"].count, 2);
        assert_eq!(events["b"].count, 1);
        assert!(events["a"].first_emitted <= events["a"].last_emitted);
        assert_eq!(stats.distinct_events(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stats = StatsTracker::new(3);
        for i in 0..5 {
            stats.record("tick", &json!(i));
        }
        let history = stats.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].data, json!(2));
        assert_eq!(history[2].data, json!(4));
    }

    #[test]
    fn test_zero_history_limit_disables_history() {
        let mut stats = StatsTracker::new(0);
        stats.record("a", &json!({}));
        assert!(stats.history().is_empty());
        assert_eq!(stats.distinct_events(), 1);
    }

    #[test]
    fn test_clear() {
        let mut stats = StatsTracker::new(5);
        stats.record("a", &json!({}));
        stats.clear();
        assert!(stats.history().is_empty());
        assert_eq!(stats.distinct_events(), 0);
    }
}
