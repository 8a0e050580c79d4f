//! Names that must be stopped after the fleet has been resurrected.

use crate::snapshot::{StateSnapshot, TargetState};

/// Ordered list of process names whose target state is stopped.
///
/// Built from a snapshot, so it is always a subset of the snapshot's names
/// and keeps the snapshot's ascending-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    names: Vec<String>,
}

impl ReconciliationPlan {
    /// Derives the plan from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
        let names = snapshot
            .entries()
            .iter()
            .filter(|entry| entry.target() == TargetState::Stopped)
            .map(|entry| entry.name().to_owned())
            .collect();
        Self { names }
    }

    /// Planned names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of planned stops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing needs stopping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` is planned.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|planned| planned == name)
    }
}
