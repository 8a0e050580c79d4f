//! Process state reconciliation for PM2 daemon restarts.
//!
//! The engine captures which processes are online and which are stopped,
//! restarts the supervisor daemon, and puts every process back into its
//! captured state. Processes are matched by name because resurrection may
//! hand out new ids. The outcome is decided by comparing online and stopped
//! counts; per-process drift is reported alongside.
//!
//! Everything talks to the supervisor through one [`SupervisorSession`]
//! created per run, so there is no ambient connection state.

mod directory;
mod guard;
mod orchestrator;
mod plan;
mod readiness;
mod reconcile;
mod reporter;
mod session;
mod snapshot;
mod state_store;
mod verify;

#[cfg(test)]
mod tests;

pub use directory::list;
pub use guard::{GuardError, RunGuard};
pub use orchestrator::{RestartError, RestartOrchestrator, RestartSettings, RunSummary};
pub use plan::ReconciliationPlan;
pub use readiness::{StabilizationPolicy, StabilizationTimeout, wait_for_settled};
pub use reconcile::{ReconcileReport, StopFailure, reconcile};
pub use reporter::{RestartPhase, RestartReporter, StructuredReporter};
pub use session::SupervisorSession;
pub use snapshot::{SnapshotEntry, SnapshotError, StateSnapshot, TargetState, capture};
pub use state_store::{
    StateFileError, StateFileInfo, list_state_files, point_latest, read_state_file,
    write_state_file,
};
pub use verify::{Drift, ObservedState, Outcome, ReconciliationResult, verify};
