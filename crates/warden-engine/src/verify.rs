//! Compares the live fleet against the captured snapshot.

use std::fmt;

use warden_supervisor::ProcessRecord;

use crate::readiness::StabilizationTimeout;
use crate::snapshot::{StateSnapshot, TargetState};

/// State a process was found in during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    /// Running.
    Online,
    /// Present but not running.
    Stopped,
    /// Not in the live table.
    Missing,
}

impl ObservedState {
    /// Lower-case label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Stopped => "stopped",
            Self::Missing => "missing",
        }
    }
}

impl From<TargetState> for ObservedState {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::Online => Self::Online,
            TargetState::Stopped => Self::Stopped,
        }
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A process whose observed state disagrees with the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    /// Process name.
    pub name: String,
    /// Captured target, `None` when the process was not in the snapshot.
    pub expected: Option<TargetState>,
    /// What verification found.
    pub actual: ObservedState,
}

impl Drift {
    /// Whether the process should have been stopped but is running.
    #[must_use]
    pub fn is_left_online(&self) -> bool {
        self.expected == Some(TargetState::Stopped) && self.actual == ObservedState::Online
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = self.expected.map_or("absent", TargetState::as_str);
        write!(
            formatter,
            "{}: expected {expected}, found {}",
            self.name, self.actual
        )
    }
}

/// Terminal verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Online and stopped counts match the snapshot.
    Converged,
    /// Counts differ or the fleet never settled; see the drift list.
    Diverged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => formatter.write_str("converged"),
            Self::Diverged => formatter.write_str("diverged"),
        }
    }
}

/// Expected and observed counts plus per-process drift.
///
/// Expected and actual totals are counted independently; a lost process
/// shows up as a smaller actual total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Processes captured online.
    pub expected_online: usize,
    /// Processes captured in any other state.
    pub expected_stopped: usize,
    /// Live processes found online.
    pub actual_online: usize,
    /// Live processes found in any other state.
    pub actual_stopped: usize,
    /// Per-process disagreements, snapshot order first.
    pub drift: Vec<Drift>,
    /// Set when the resurrected fleet was still transitioning at the
    /// deadline and was reconciled from the last listing.
    pub unsettled: Option<StabilizationTimeout>,
}

impl ReconciliationResult {
    /// Convergence is decided on counts, and only for a fleet that settled.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        if self.unsettled.is_none()
            && self.actual_online == self.expected_online
            && self.actual_stopped == self.expected_stopped
        {
            Outcome::Converged
        } else {
            Outcome::Diverged
        }
    }

    /// Names expected stopped but still running.
    #[must_use]
    pub fn left_online(&self) -> Vec<&str> {
        self.drift
            .iter()
            .filter(|drift| drift.is_left_online())
            .map(|drift| drift.name.as_str())
            .collect()
    }

    /// Total captured processes.
    #[must_use]
    pub const fn expected_total(&self) -> usize {
        self.expected_online + self.expected_stopped
    }

    /// Total live processes.
    #[must_use]
    pub const fn actual_total(&self) -> usize {
        self.actual_online + self.actual_stopped
    }
}

/// Diffs the live table against the snapshot.
#[must_use]
pub fn verify(snapshot: &StateSnapshot, live: &[ProcessRecord]) -> ReconciliationResult {
    let observe =
        |record: &ProcessRecord| ObservedState::from(TargetState::classify(&record.status));
    let actual_online = live
        .iter()
        .filter(|record| observe(*record) == ObservedState::Online)
        .count();
    let mut drift = Vec::new();
    for entry in snapshot.entries() {
        let actual = live
            .iter()
            .find(|record| record.name == entry.name())
            .map_or(ObservedState::Missing, observe);
        if actual != ObservedState::from(entry.target()) {
            drift.push(Drift {
                name: entry.name().to_owned(),
                expected: Some(entry.target()),
                actual,
            });
        }
    }
    for record in live {
        if snapshot.target_of(&record.name).is_none() {
            drift.push(Drift {
                name: record.name.clone(),
                expected: None,
                actual: observe(record),
            });
        }
    }
    ReconciliationResult {
        expected_online: snapshot.expected_online(),
        expected_stopped: snapshot.expected_stopped(),
        actual_online,
        actual_stopped: live.len() - actual_online,
        drift,
        unsettled: None,
    }
}
