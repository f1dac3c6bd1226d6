//! Outstanding-operation accounting fed by collaborator lifecycle events.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Which counter an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A template fetch.
    Template,
    /// A state store operation.
    State,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => f.write_str("template"),
            Self::State => f.write_str("state"),
        }
    }
}

/// Receipt for a registered operation, consumed on completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use = "complete the operation with the token or its id"]
pub struct OperationToken {
    kind: OperationKind,
    id: String,
}

impl OperationToken {
    pub(crate) fn new(kind: OperationKind, id: String) -> Self {
        Self { kind, id }
    }

    /// Counter the operation was registered under.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Operation id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Pending operation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingOperations {
    /// Outstanding template operations.
    pub template: usize,
    /// Outstanding state operations.
    pub state: usize,
    /// Distinct operation ids in progress.
    pub active: usize,
}

impl PendingOperations {
    /// Whether both counters are zero.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.template == 0 && self.state == 0
    }
}

/// Id-keyed multiset per kind. Counts can only drop for ids that were
/// registered, so they never go negative.
#[derive(Debug, Default)]
pub(crate) struct OperationTracker {
    template: HashMap<String, usize>,
    state: HashMap<String, usize>,
}

impl OperationTracker {
    fn map_mut(&mut self, kind: OperationKind) -> &mut HashMap<String, usize> {
        match kind {
            OperationKind::Template => &mut self.template,
            OperationKind::State => &mut self.state,
        }
    }

    pub(crate) fn register(&mut self, kind: OperationKind, id: &str) {
        let count = self.map_mut(kind).entry(id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Returns `false` when `id` has no outstanding registration.
    pub(crate) fn complete(&mut self, kind: OperationKind, id: &str) -> bool {
        let map = self.map_mut(kind);
        let Some(count) = map.get_mut(id) else {
            return false;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(id);
        }
        true
    }

    pub(crate) fn pending(&self) -> PendingOperations {
        let active = self
            .state
            .keys()
            .filter(|id| !self.template.contains_key(*id))
            .count()
            .saturating_add(self.template.len());
        PendingOperations {
            template: self.template.values().sum(),
            state: self.state.values().sum(),
            active,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.template.clear();
        self.state.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_complete() {
        let mut ops = OperationTracker::default();
        ops.register(OperationKind::Template, "t1");
        ops.register(OperationKind::State, "s1");
        assert_eq!(
            ops.pending(),
            PendingOperations {
                template: 1,
                state: 1,
                active: 2
            }
        );

        assert!(ops.complete(OperationKind::Template, "t1"));
        assert!(ops.complete(OperationKind::State, "s1"));
        assert!(ops.pending().is_idle());
        assert_eq!(ops.pending().active, 0);
    }

    #[test]
    fn test_over_completion_is_a_no_op() {
        let mut ops = OperationTracker::default();
        assert!(!ops.complete(OperationKind::Template, "ghost"));
        ops.register(OperationKind::Template, "t1");
        assert!(ops.complete(OperationKind::Template, "t1"));
        assert!(!ops.complete(OperationKind::Template, "t1"));
        assert_eq!(ops.pending().template, 0);
    }

    #[test]
    fn test_duplicate_ids_are_counted() {
        let mut ops = OperationTracker::default();
        ops.register(OperationKind::State, "save");
        ops.register(OperationKind::State, "save");
        assert_eq!(ops.pending().state, 2);
        assert_eq!(ops.pending().active, 1);
        assert!(ops.complete(OperationKind::State, "save"));
        assert_eq!(ops.pending().state, 1);
    }

    #[test]
    fn test_kinds_are_separate() {
        let mut ops = OperationTracker::default();
        ops.register(OperationKind::Template, "shared-id");
        assert!(!ops.complete(OperationKind::State, "shared-id"));
        assert_eq!(ops.pending().template, 1);
        ops.clear();
        assert!(ops.pending().is_idle());
    }
}
