//! Point-in-time capture of the fleet's online/stopped state.

use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use warden_supervisor::{ProcessRecord, ProcessStatus, Supervisor, SupervisorError};

use crate::SupervisorSession;
use crate::plan::ReconciliationPlan;

/// State a process should be returned to after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Leave the process running.
    Online,
    /// Stop the process once it has been resurrected.
    Stopped,
}

impl TargetState {
    /// Classifies a supervisor status. Only `online` maps to [`Self::Online`];
    /// errored and transitional processes are held stopped.
    #[must_use]
    pub const fn classify(status: &ProcessStatus) -> Self {
        if status.is_online() {
            Self::Online
        } else {
            Self::Stopped
        }
    }

    /// Lower-case label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One captured process with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    record: ProcessRecord,
    target: TargetState,
}

impl SnapshotEntry {
    /// Process record as observed at capture time.
    #[must_use]
    pub const fn record(&self) -> &ProcessRecord {
        &self.record
    }

    /// Process name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Target state derived from the captured status.
    #[must_use]
    pub const fn target(&self) -> TargetState {
        self.target
    }
}

/// Errors raised while building a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Listing the supervisor failed.
    #[error("failed to list processes for the snapshot: {source}")]
    Listing {
        /// Underlying supervisor failure.
        #[source]
        source: SupervisorError,
    },
    /// Two processes share a name, so name-based reconciliation is ambiguous.
    #[error("process name '{name}' appears more than once; names must be unique")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// Immutable capture of every process ordered by ascending id.
///
/// Equality compares the entries only; two captures of an unchanged fleet
/// are equal whatever their capture times.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    entries: Vec<SnapshotEntry>,
    captured_at: u64,
}

impl PartialEq for StateSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for StateSnapshot {}

impl StateSnapshot {
    /// Builds a snapshot from listed records.
    pub fn from_records(
        mut records: Vec<ProcessRecord>,
        captured_at: u64,
    ) -> Result<Self, SnapshotError> {
        records.sort_by_key(|record| record.id);
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.name.as_str()) {
                return Err(SnapshotError::DuplicateName {
                    name: record.name.clone(),
                });
            }
        }
        let entries = records
            .into_iter()
            .map(|record| SnapshotEntry {
                target: TargetState::classify(&record.status),
                record,
            })
            .collect();
        Ok(Self {
            entries,
            captured_at,
        })
    }

    /// Captured entries in ascending id order.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Capture time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn captured_at(&self) -> u64 {
        self.captured_at
    }

    /// Number of captured processes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the fleet was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of processes expected online after the restart.
    #[must_use]
    pub fn expected_online(&self) -> usize {
        self.count(TargetState::Online)
    }

    /// Number of processes expected stopped after the restart.
    #[must_use]
    pub fn expected_stopped(&self) -> usize {
        self.count(TargetState::Stopped)
    }

    /// Target state recorded for `name`, if it was captured.
    #[must_use]
    pub fn target_of(&self, name: &str) -> Option<TargetState> {
        self.entries
            .iter()
            .find(|entry| entry.name() == name)
            .map(SnapshotEntry::target)
    }

    /// Names in ascending id order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(SnapshotEntry::name)
    }

    /// Names that must be stopped after resurrection.
    #[must_use]
    pub fn plan(&self) -> ReconciliationPlan {
        ReconciliationPlan::from_snapshot(self)
    }

    fn count(&self, target: TargetState) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.target == target)
            .count()
    }
}

/// Lists the live directory once and captures it.
pub fn capture<S: Supervisor>(
    session: &mut SupervisorSession<S>,
) -> Result<StateSnapshot, SnapshotError> {
    let records = session
        .list()
        .map_err(|source| SnapshotError::Listing { source })?;
    StateSnapshot::from_records(records, epoch_millis())
}

pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
