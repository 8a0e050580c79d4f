//! Progress reporting for restart and restore runs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use warden_supervisor::SupervisorError;

use crate::orchestrator::RestartError;
use crate::readiness::StabilizationTimeout;
use crate::reconcile::ReconcileReport;
use crate::snapshot::StateSnapshot;
use crate::verify::ReconciliationResult;

pub(crate) const RESTART_TARGET: &str = "warden::restart";

/// Phases of a run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartPhase {
    /// Nothing has happened yet.
    Idle,
    /// Capturing the snapshot.
    Snapshotting,
    /// Stopping every process.
    StoppingAll,
    /// Killing the daemon.
    KillingDaemon,
    /// Waiting for the daemon to exit and release its socket.
    Cooling,
    /// Reconnecting and replaying the dump.
    Resurrecting,
    /// Waiting for the resurrected fleet to settle.
    Stabilizing,
    /// Stopping processes that were stopped before.
    Reconciling,
    /// Re-listing and diffing against the snapshot.
    Verifying,
    /// Counts match the snapshot.
    Converged,
    /// Counts differ from the snapshot.
    Diverged,
}

impl RestartPhase {
    /// Snake-case label used in structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Snapshotting => "snapshotting",
            Self::StoppingAll => "stopping_all",
            Self::KillingDaemon => "killing_daemon",
            Self::Cooling => "cooling",
            Self::Resurrecting => "resurrecting",
            Self::Stabilizing => "stabilizing",
            Self::Reconciling => "reconciling",
            Self::Verifying => "verifying",
            Self::Converged => "converged",
            Self::Diverged => "diverged",
        }
    }

    /// Whether the run has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Diverged)
    }
}

impl fmt::Display for RestartPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Observer notified as a run progresses.
pub trait RestartReporter {
    /// A phase was entered.
    fn phase_entered(&self, phase: RestartPhase);

    /// The snapshot was captured and written to `path`.
    fn snapshot_saved(&self, snapshot: &StateSnapshot, path: &Path);

    /// Killing the daemon failed; the run continues.
    fn kill_failed(&self, error: &SupervisorError);

    /// The fleet was still transitioning at the deadline; reconciliation
    /// proceeds from the last listing.
    fn stabilization_timed_out(&self, timeout: &StabilizationTimeout);

    /// Reconciliation finished.
    fn reconciled(&self, report: &ReconcileReport);

    /// Verification finished.
    fn run_completed(&self, result: &ReconciliationResult);

    /// The run aborted.
    fn run_aborted(&self, error: &RestartError);
}

impl<T> RestartReporter for Arc<T>
where
    T: RestartReporter + ?Sized,
{
    fn phase_entered(&self, phase: RestartPhase) {
        (**self).phase_entered(phase);
    }

    fn snapshot_saved(&self, snapshot: &StateSnapshot, path: &Path) {
        (**self).snapshot_saved(snapshot, path);
    }

    fn kill_failed(&self, error: &SupervisorError) {
        (**self).kill_failed(error);
    }

    fn stabilization_timed_out(&self, timeout: &StabilizationTimeout) {
        (**self).stabilization_timed_out(timeout);
    }

    fn reconciled(&self, report: &ReconcileReport) {
        (**self).reconciled(report);
    }

    fn run_completed(&self, result: &ReconciliationResult) {
        (**self).run_completed(result);
    }

    fn run_aborted(&self, error: &RestartError) {
        (**self).run_aborted(error);
    }
}

/// Reporter that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RestartReporter for StructuredReporter {
    fn phase_entered(&self, phase: RestartPhase) {
        tracing::info!(
            target: RESTART_TARGET,
            event = "phase_entered",
            phase = %phase,
            "entered phase"
        );
    }

    fn snapshot_saved(&self, snapshot: &StateSnapshot, path: &Path) {
        tracing::info!(
            target: RESTART_TARGET,
            event = "snapshot_saved",
            processes = snapshot.len(),
            expected_online = snapshot.expected_online(),
            expected_stopped = snapshot.expected_stopped(),
            file = %path.display(),
            "snapshot saved"
        );
    }

    fn kill_failed(&self, error: &SupervisorError) {
        tracing::warn!(
            target: RESTART_TARGET,
            event = "kill_failed",
            error = %error,
            "daemon kill failed; continuing"
        );
    }

    fn stabilization_timed_out(&self, timeout: &StabilizationTimeout) {
        tracing::warn!(
            target: RESTART_TARGET,
            event = "stabilization_timed_out",
            waited_ms = timeout.waited_ms,
            detail = %timeout.detail,
            "fleet did not settle; reconciling anyway"
        );
    }

    fn reconciled(&self, report: &ReconcileReport) {
        tracing::info!(
            target: RESTART_TARGET,
            event = "reconciled",
            attempted = report.attempted.len(),
            failed = report.failed.len(),
            not_found = report.not_found.len(),
            "reconciliation finished"
        );
    }

    fn run_completed(&self, result: &ReconciliationResult) {
        tracing::info!(
            target: RESTART_TARGET,
            event = "run_completed",
            outcome = %result.outcome(),
            expected_online = result.expected_online,
            expected_stopped = result.expected_stopped,
            actual_online = result.actual_online,
            actual_stopped = result.actual_stopped,
            drift = result.drift.len(),
            unsettled = result.unsettled.is_some(),
            "run completed"
        );
    }

    fn run_aborted(&self, error: &RestartError) {
        tracing::error!(
            target: RESTART_TARGET,
            event = "run_aborted",
            error = %error,
            snapshot = ?error.snapshot_path(),
            "run aborted"
        );
    }
}
