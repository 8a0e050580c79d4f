//! Applies a reconciliation plan to the live process table.

use tracing::{info, warn};
use warden_supervisor::{Supervisor, SupervisorError};

use crate::SupervisorSession;
use crate::plan::ReconciliationPlan;

const RECONCILE_TARGET: &str = "warden::reconcile";

/// A planned stop the supervisor refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFailure {
    /// Process that stayed up.
    pub name: String,
    /// Supervisor diagnostic.
    pub message: String,
}

/// What the reconciler did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Names a stop was issued for, in plan order.
    pub attempted: Vec<String>,
    /// Planned names already stopped or errored.
    pub already_stopped: Vec<String>,
    /// Planned names absent from the live table.
    pub not_found: Vec<String>,
    /// Stops that failed.
    pub failed: Vec<StopFailure>,
}

impl ReconcileReport {
    /// Whether every attempted stop succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stops every planned process that is online, or still transitioning, in
/// the live table.
///
/// Matching is by name because ids change across resurrection. A process
/// caught mid-transition (a crash loop sitting in `waiting restart`) would
/// come back online on its own, so it is stopped too. A failed stop
/// is logged and recorded, and the remaining names are still processed.
/// Only the initial listing can fail the call.
pub fn reconcile<S: Supervisor>(
    plan: &ReconciliationPlan,
    session: &mut SupervisorSession<S>,
) -> Result<ReconcileReport, SupervisorError> {
    let live = session.list()?;
    let mut report = ReconcileReport::default();
    for name in plan.names() {
        let Some(record) = live.iter().find(|record| &record.name == name) else {
            warn!(
                target: RECONCILE_TARGET,
                process = %name,
                "planned process not found after resurrection"
            );
            report.not_found.push(name.clone());
            continue;
        };
        if !record.status.is_online() && record.status.is_settled() {
            report.already_stopped.push(name.clone());
            continue;
        }
        report.attempted.push(name.clone());
        match session.stop(name) {
            Ok(()) => info!(
                target: RECONCILE_TARGET,
                process = %name,
                id = record.id,
                "stopped process"
            ),
            Err(error) => {
                warn!(
                    target: RECONCILE_TARGET,
                    process = %name,
                    error = %error,
                    "failed to stop process; continuing"
                );
                report.failed.push(StopFailure {
                    name: name.clone(),
                    message: error.to_string(),
                });
            }
        }
    }
    Ok(report)
}
