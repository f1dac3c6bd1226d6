//! Listener registration types.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ListenerResult;

/// Shared listener callback.
///
/// Keep a clone of the `Arc` to remove the listener by identity with
/// [`ListenerKey::Callback`].
pub type Callback = Arc<dyn Fn(&mut Envelope) -> ListenerResult + Send + Sync>;

/// Dispatch priority. Lower values fire first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Fires before everything else.
    Critical = 0,
    /// Fires before normal listeners.
    High = 1,
    /// Default priority.
    #[default]
    Normal = 2,
    /// Fires last.
    Low = 3,
}

/// Options for [`EventBus::on`](crate::EventBus::on).
#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Dispatch priority.
    pub priority: Priority,
    /// Remove the listener after its first invocation.
    pub once: bool,
    /// Free-form label reported in logs alongside the listener id.
    pub context: Option<String>,
    /// Explicit listener id. Generated when `None`.
    pub id: Option<String>,
    /// Receive buffered replay entries on registration.
    pub replay: bool,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            once: false,
            context: None,
            id: None,
            replay: true,
        }
    }
}

impl ListenerOptions {
    /// Options with the given priority.
    #[must_use]
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Make the listener one-shot.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Attach a context label.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Use an explicit listener id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Opt out of replay delivery.
    #[must_use]
    pub fn without_replay(mut self) -> Self {
        self.replay = false;
        self
    }
}

/// Identifies listener(s) to remove in [`EventBus::off`](crate::EventBus::off).
#[derive(Clone)]
pub enum ListenerKey {
    /// Match by registered id.
    Id(String),
    /// Match by callback identity (`Arc::ptr_eq`).
    Callback(Callback),
}

impl fmt::Debug for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for ListenerKey {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for ListenerKey {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<&Callback> for ListenerKey {
    fn from(cb: &Callback) -> Self {
        Self::Callback(Arc::clone(cb))
    }
}

/// A registered listener.
pub(crate) struct Listener {
    pub(crate) id: String,
    pub(crate) callback: Callback,
    pub(crate) priority: Priority,
    pub(crate) once: bool,
    pub(crate) context: Option<String>,
    pub(crate) registered_at: DateTime<Utc>,
    fired: AtomicBool,
}

impl Listener {
    pub(crate) fn new(callback: Callback, opts: ListenerOptions) -> Self {
        Self {
            id: opts.id.unwrap_or_else(generate_listener_id),
            callback,
            priority: opts.priority,
            once: opts.once,
            context: opts.context,
            registered_at: Utc::now(),
            fired: AtomicBool::new(false),
        }
    }

    /// Claim the right to fire. Always `true` for persistent listeners;
    /// `true` exactly once for one-shot listeners.
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.fired.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn matches(&self, key: &ListenerKey) -> bool {
        match key {
            ListenerKey::Id(id) => self.id == *id,
            ListenerKey::Callback(cb) => Arc::ptr_eq(&self.callback, cb),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("once", &self.once)
            .field("context", &self.context)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

fn generate_listener_id() -> String {
    format!("listener_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Arc::new(|_env: &mut Envelope| Ok(()))
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Listener::new(noop(), ListenerOptions::default());
        let b = Listener::new(noop(), ListenerOptions::default());
        assert!(a.id.starts_with("listener_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let l = Listener::new(noop(), ListenerOptions::default().id("coord"));
        assert_eq!(l.id, "coord");
        assert!(l.matches(&ListenerKey::from("coord")));
        assert!(!l.matches(&ListenerKey::from("other")));
    }

    #[test]
    fn test_once_listener_claims_once() {
        let l = Listener::new(noop(), ListenerOptions::default().once());
        assert!(l.claim());
        assert!(!l.claim());

        let persistent = Listener::new(noop(), ListenerOptions::default());
        assert!(persistent.claim());
        assert!(persistent.claim());
    }

    #[test]
    fn test_match_by_callback_identity() {
        let cb = noop();
        let l = Listener::new(Arc::clone(&cb), ListenerOptions::default());
        assert!(l.matches(&ListenerKey::from(&cb)));
        assert!(!l.matches(&ListenerKey::from(&noop())));
    }
}
