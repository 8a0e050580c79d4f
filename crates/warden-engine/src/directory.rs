//! Read-only view over the supervisor's process table.

use warden_supervisor::{ProcessRecord, Supervisor, SupervisorError};

/// Lists every managed process sorted by id, which is launch order.
///
/// Failures are returned as-is; nothing is retried here.
pub fn list<S>(supervisor: &mut S) -> Result<Vec<ProcessRecord>, SupervisorError>
where
    S: Supervisor + ?Sized,
{
    let mut records = supervisor.list()?;
    records.sort_by_key(|record| record.id);
    Ok(records)
}
