//! Shared doubles for the engine test suites.

mod fake_supervisor;
mod reporter;

pub use fake_supervisor::FakeSupervisor;
pub use reporter::{RecordingReporter, ReportEvent};
use warden_supervisor::ProcessRecord;

/// Shorthand for a record with identity and status only.
pub fn record(id: u32, name: &str, status: &str) -> ProcessRecord {
    ProcessRecord::new(id, name, status)
}
