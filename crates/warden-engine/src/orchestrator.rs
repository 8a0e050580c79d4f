//! Sequences a daemon restart and restores the pre-restart process states.
//!
//! A restart captures the fleet, persists the capture, tears the daemon
//! down, resurrects it, waits for the resurrected fleet to settle, stops the
//! processes that were stopped before, and verifies the result. A restore
//! runs the same tail against a previously saved state file without killing
//! the daemon.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use warden_supervisor::{Supervisor, SupervisorError};

use crate::readiness::{StabilizationPolicy, wait_for_settled};
use crate::reconcile::{ReconcileReport, reconcile};
use crate::reporter::{RESTART_TARGET, RestartPhase, RestartReporter};
use crate::session::SupervisorSession;
use crate::snapshot::{SnapshotError, StateSnapshot, capture};
use crate::state_store::{StateFileError, write_state_file};
use crate::verify::{Outcome, ReconciliationResult, verify};

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum RestartError {
    /// The supervisor could not be reached before anything changed.
    #[error("PM2 is unavailable; nothing was changed: {source}")]
    SupervisorUnavailable {
        /// Underlying supervisor failure.
        #[source]
        source: SupervisorError,
    },
    /// The snapshot could not be built.
    #[error("could not capture process states: {source}")]
    Snapshot {
        /// Snapshot validation error.
        #[source]
        source: SnapshotError,
    },
    /// The snapshot could not be persisted before teardown.
    #[error("could not persist the snapshot; nothing was changed: {source}")]
    StateFile {
        /// Underlying state file error.
        #[source]
        source: StateFileError,
    },
    /// Stopping the fleet failed; some processes may already be stopped.
    #[error("aborted while stopping all processes (state saved to {}): {source}", snapshot_path.display())]
    AbortedDuringTeardown {
        /// Persisted snapshot.
        snapshot_path: PathBuf,
        /// Underlying supervisor failure.
        #[source]
        source: SupervisorError,
    },
    /// The daemon is down and resurrection failed.
    #[error(
        "resurrection failed after the daemon was killed; fleet state is unknown (state saved to {}): {source}",
        snapshot_path.display()
    )]
    AbortedDuringResurrection {
        /// Persisted snapshot for manual recovery.
        snapshot_path: PathBuf,
        /// Underlying supervisor failure.
        #[source]
        source: SupervisorError,
    },
    /// Listing failed after resurrection.
    #[error("supervisor call failed while {phase} (state saved to {}): {source}", snapshot_path.display())]
    Supervisor {
        /// Phase that failed.
        phase: RestartPhase,
        /// Persisted snapshot.
        snapshot_path: PathBuf,
        /// Underlying supervisor failure.
        #[source]
        source: SupervisorError,
    },
}

impl RestartError {
    /// Operator remediation for the failure.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::SupervisorUnavailable { .. } => {
                "check that PM2 is installed and its daemon is reachable with `pm2 status`"
            }
            Self::Snapshot { .. } => "give every PM2 process a unique name and retry",
            Self::StateFile { .. } => {
                "check that the temporary directory is writable and has free space"
            }
            Self::AbortedDuringTeardown { .. } => {
                "some processes may already be stopped; inspect `pm2 status` before retrying"
            }
            Self::AbortedDuringResurrection { .. } => {
                "run `pm2 resurrect` manually, then compare `pm2 status` with the saved state file"
            }
            Self::Supervisor { .. } => {
                "inspect `pm2 status` and `pm2 logs`, then stop the expected processes by hand"
            }
        }
    }

    /// Snapshot file to recover from, once one exists.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        match self {
            Self::AbortedDuringTeardown { snapshot_path, .. }
            | Self::AbortedDuringResurrection { snapshot_path, .. }
            | Self::Supervisor { snapshot_path, .. } => Some(snapshot_path),
            Self::SupervisorUnavailable { .. } | Self::Snapshot { .. } | Self::StateFile { .. } => {
                None
            }
        }
    }
}

/// Timing knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartSettings {
    /// Pause after killing the daemon.
    pub cooling_delay: Duration,
    /// Settle poll bounds after resurrection.
    pub stabilization: StabilizationPolicy,
}

/// Everything a finished run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Snapshot the run restored towards.
    pub snapshot: StateSnapshot,
    /// Where that snapshot is stored.
    pub snapshot_path: PathBuf,
    /// Stops issued during reconciliation.
    pub reconcile: ReconcileReport,
    /// Verification counts and drift.
    pub result: ReconciliationResult,
}

impl RunSummary {
    /// Terminal verdict.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.result.outcome()
    }
}

/// Drives restart and restore runs.
pub struct RestartOrchestrator<'a, R: RestartReporter + ?Sized> {
    settings: RestartSettings,
    reporter: &'a R,
}

impl<'a, R: RestartReporter + ?Sized> RestartOrchestrator<'a, R> {
    /// Creates an orchestrator reporting to `reporter`.
    pub const fn new(settings: RestartSettings, reporter: &'a R) -> Self {
        Self { settings, reporter }
    }

    /// Restarts the daemon and restores every process's prior state.
    ///
    /// The snapshot is written to `snapshot_path` before anything is torn
    /// down. Divergence is reported in the summary, not as an error; a fleet
    /// that never settles is still reconciled and reported as diverged.
    pub fn restart<S: Supervisor>(
        &self,
        supervisor: S,
        snapshot_path: &Path,
    ) -> Result<RunSummary, RestartError> {
        self.reporter.phase_entered(RestartPhase::Idle);
        self.run_restart(supervisor, snapshot_path)
            .inspect_err(|error| self.reporter.run_aborted(error))
    }

    /// Resurrects the daemon's dump and reconciles it to a saved snapshot.
    pub fn restore<S: Supervisor>(
        &self,
        supervisor: S,
        snapshot: StateSnapshot,
        snapshot_path: &Path,
    ) -> Result<RunSummary, RestartError> {
        self.reporter.phase_entered(RestartPhase::Idle);
        self.run_restore(supervisor, snapshot, snapshot_path)
            .inspect_err(|error| self.reporter.run_aborted(error))
    }

    fn run_restart<S: Supervisor>(
        &self,
        supervisor: S,
        snapshot_path: &Path,
    ) -> Result<RunSummary, RestartError> {
        self.reporter.phase_entered(RestartPhase::Snapshotting);
        let mut session = SupervisorSession::open(supervisor)
            .map_err(|source| RestartError::SupervisorUnavailable { source })?;
        let snapshot = capture(&mut session).map_err(|error| match error {
            SnapshotError::Listing { source } => RestartError::SupervisorUnavailable { source },
            duplicate @ SnapshotError::DuplicateName { .. } => {
                RestartError::Snapshot { source: duplicate }
            }
        })?;
        write_state_file(snapshot_path, &snapshot)
            .map_err(|source| RestartError::StateFile { source })?;
        self.reporter.snapshot_saved(&snapshot, snapshot_path);

        self.reporter.phase_entered(RestartPhase::StoppingAll);
        session
            .stop_all()
            .map_err(|source| RestartError::AbortedDuringTeardown {
                snapshot_path: snapshot_path.to_path_buf(),
                source,
            })?;

        self.reporter.phase_entered(RestartPhase::KillingDaemon);
        if let Err(error) = session.kill_daemon() {
            self.reporter.kill_failed(&error);
        }

        self.reporter.phase_entered(RestartPhase::Cooling);
        thread::sleep(self.settings.cooling_delay);

        self.resurrect_and_reconcile(session, snapshot, snapshot_path)
    }

    fn run_restore<S: Supervisor>(
        &self,
        supervisor: S,
        snapshot: StateSnapshot,
        snapshot_path: &Path,
    ) -> Result<RunSummary, RestartError> {
        let session = SupervisorSession::open(supervisor)
            .map_err(|source| RestartError::SupervisorUnavailable { source })?;
        info!(
            target: RESTART_TARGET,
            file = %snapshot_path.display(),
            processes = snapshot.len(),
            "restoring saved state"
        );
        self.resurrect_and_reconcile(session, snapshot, snapshot_path)
    }

    fn resurrect_and_reconcile<S: Supervisor>(
        &self,
        mut session: SupervisorSession<S>,
        snapshot: StateSnapshot,
        snapshot_path: &Path,
    ) -> Result<RunSummary, RestartError> {
        let saved_at = || snapshot_path.to_path_buf();

        self.reporter.phase_entered(RestartPhase::Resurrecting);
        session
            .resurrect()
            .map_err(|source| RestartError::AbortedDuringResurrection {
                snapshot_path: saved_at(),
                source,
            })?;

        self.reporter.phase_entered(RestartPhase::Stabilizing);
        let unsettled = wait_for_settled(&mut session, &snapshot, self.settings.stabilization)
            .err()
            .inspect(|timeout| self.reporter.stabilization_timed_out(timeout));

        self.reporter.phase_entered(RestartPhase::Reconciling);
        let plan = snapshot.plan();
        let report =
            reconcile(&plan, &mut session).map_err(|source| RestartError::Supervisor {
                phase: RestartPhase::Reconciling,
                snapshot_path: saved_at(),
                source,
            })?;
        self.reporter.reconciled(&report);

        self.reporter.phase_entered(RestartPhase::Verifying);
        let live = session.list().map_err(|source| RestartError::Supervisor {
            phase: RestartPhase::Verifying,
            snapshot_path: saved_at(),
            source,
        })?;
        session.close();
        let mut result = verify(&snapshot, &live);
        result.unsettled = unsettled;
        self.reporter.phase_entered(match result.outcome() {
            Outcome::Converged => RestartPhase::Converged,
            Outcome::Diverged => RestartPhase::Diverged,
        });
        self.reporter.run_completed(&result);

        Ok(RunSummary {
            snapshot,
            snapshot_path: snapshot_path.to_path_buf(),
            reconcile: report,
            result,
        })
    }
}
