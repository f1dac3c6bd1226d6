//! Named-presence registry gating the `SYSTEMS_READY` phase.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// Systems required by default before startup proceeds.
pub const DEFAULT_REQUIRED_SYSTEMS: [&str; 3] = ["state_manager", "component_manager", "renderer"];

/// Registry of systems that have announced themselves.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct SystemRegistry {
    systems: Arc<DashMap<String, DateTime<Utc>>>,
}

impl SystemRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with `names` already registered.
    #[must_use]
    pub fn with_systems<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        for name in names {
            registry.register(name);
        }
        registry
    }

    /// Announce a system. Returns `false` if it was already registered.
    pub fn register(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        let fresh = self.systems.insert(name.clone(), Utc::now()).is_none();
        debug!(system = %name, fresh, "System registered");
        fresh
    }

    /// Withdraw a system. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.systems.remove(name).is_some()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    /// Registration time of `name`.
    #[must_use]
    pub fn registered_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.systems.get(name).map(|entry| *entry.value())
    }

    /// The subset of `required` that is not registered, in the given order.
    #[must_use]
    pub fn missing(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.is_registered(name))
            .cloned()
            .collect()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<String> {
        DEFAULT_REQUIRED_SYSTEMS.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_missing_preserves_required_order() {
        let registry = SystemRegistry::with_systems(["component_manager"]);
        assert_eq!(registry.missing(&required()), ["state_manager", "renderer"]);
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = SystemRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register("renderer"));
        assert!(!registry.register("renderer"));
        assert!(registry.registered_at("renderer").is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("renderer"));
        assert!(!registry.is_registered("renderer"));
    }

    #[test]
    fn test_clones_share_registry() {
        let registry = SystemRegistry::new();
        let clone = registry.clone();
        for name in DEFAULT_REQUIRED_SYSTEMS {
            clone.register(name);
        }
        assert!(registry.missing(&required()).is_empty());
    }
}
