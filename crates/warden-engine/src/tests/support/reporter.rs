//! Test double for [`RestartReporter`] that records events for assertions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use warden_supervisor::SupervisorError;

use crate::{
    Outcome, ReconcileReport, ReconciliationResult, RestartError, RestartPhase, RestartReporter,
    StabilizationTimeout, StateSnapshot,
};

/// Events observed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Phase(RestartPhase),
    SnapshotSaved { processes: usize, path: PathBuf },
    KillFailed(String),
    Unsettled(String),
    Reconciled { attempted: Vec<String> },
    Completed(Outcome),
    Aborted(String),
}

/// Records reporter callbacks.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    /// Phases in the order they were entered.
    pub fn phases(&self) -> Vec<RestartPhase> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Phase(phase) => Some(phase),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ReportEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl RestartReporter for RecordingReporter {
    fn phase_entered(&self, phase: RestartPhase) {
        self.record(ReportEvent::Phase(phase));
    }

    fn snapshot_saved(&self, snapshot: &StateSnapshot, path: &Path) {
        self.record(ReportEvent::SnapshotSaved {
            processes: snapshot.len(),
            path: path.to_path_buf(),
        });
    }

    fn kill_failed(&self, error: &SupervisorError) {
        self.record(ReportEvent::KillFailed(error.to_string()));
    }

    fn stabilization_timed_out(&self, timeout: &StabilizationTimeout) {
        self.record(ReportEvent::Unsettled(timeout.detail.clone()));
    }

    fn reconciled(&self, report: &ReconcileReport) {
        self.record(ReportEvent::Reconciled {
            attempted: report.attempted.clone(),
        });
    }

    fn run_completed(&self, result: &ReconciliationResult) {
        self.record(ReportEvent::Completed(result.outcome()));
    }

    fn run_aborted(&self, error: &RestartError) {
        self.record(ReportEvent::Aborted(error.to_string()));
    }
}
