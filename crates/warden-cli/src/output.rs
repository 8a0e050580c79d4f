//! Human-readable reports written to stdout.
//!
//! Logs go to stderr through `tracing`; everything here is the operator's
//! view of a run and is kept deliberately plain so it can be pasted into a
//! ticket.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use warden_config::{DetectedPlatform, PlatformProfile};
use warden_engine::{
    ReconcileReport, ReconciliationResult, RestartError, RestartPhase, RestartReporter,
    RunSummary, StabilizationTimeout, StateFileInfo, StateSnapshot, StructuredReporter,
};
use warden_supervisor::{ProcessRecord, ProcessStatus, SupervisorError};

use crate::AppError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Reporter that narrates a run on a writer and mirrors it to the log.
pub(crate) struct ConsoleReporter<W: Write> {
    writer: RefCell<W>,
    structured: StructuredReporter,
}

impl<W: Write> ConsoleReporter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
            structured: StructuredReporter::new(),
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn line(&self, args: std::fmt::Arguments<'_>) {
        let mut writer = self.writer.borrow_mut();
        let _ = writer.write_fmt(args);
        let _ = writer.write_all(b"\n");
    }
}

fn phase_line(phase: RestartPhase) -> Option<&'static str> {
    match phase {
        RestartPhase::Snapshotting => Some("Capturing process states..."),
        RestartPhase::StoppingAll => Some("Stopping all processes..."),
        RestartPhase::KillingDaemon => Some("Killing the PM2 daemon..."),
        RestartPhase::Cooling => Some("Waiting for the daemon to exit..."),
        RestartPhase::Resurrecting => Some("Resurrecting processes..."),
        RestartPhase::Stabilizing => Some("Waiting for processes to settle..."),
        RestartPhase::Reconciling => Some("Stopping processes that were stopped before..."),
        RestartPhase::Verifying => Some("Verifying process states..."),
        RestartPhase::Idle | RestartPhase::Converged | RestartPhase::Diverged => None,
    }
}

impl<W: Write> RestartReporter for ConsoleReporter<W> {
    fn phase_entered(&self, phase: RestartPhase) {
        self.structured.phase_entered(phase);
        if let Some(text) = phase_line(phase) {
            self.line(format_args!("{text}"));
        }
    }

    fn snapshot_saved(&self, snapshot: &StateSnapshot, path: &Path) {
        self.structured.snapshot_saved(snapshot, path);
        self.line(format_args!(
            "Captured {} processes ({} online, {} stopped); saved to {}",
            snapshot.len(),
            snapshot.expected_online(),
            snapshot.expected_stopped(),
            path.display()
        ));
    }

    fn kill_failed(&self, error: &SupervisorError) {
        self.structured.kill_failed(error);
        self.line(format_args!("warning: {error}; continuing"));
    }

    fn stabilization_timed_out(&self, timeout: &StabilizationTimeout) {
        self.structured.stabilization_timed_out(timeout);
        self.line(format_args!("warning: {timeout}; reconciling anyway"));
    }

    fn reconciled(&self, report: &ReconcileReport) {
        self.structured.reconciled(report);
        self.line(format_args!("Stopped {} processes", report.attempted.len()));
        for failure in &report.failed {
            self.line(format_args!(
                "warning: could not stop {}: {}",
                failure.name, failure.message
            ));
        }
        for name in &report.not_found {
            self.line(format_args!("warning: {name} did not come back"));
        }
    }

    fn run_completed(&self, result: &ReconciliationResult) {
        self.structured.run_completed(result);
    }

    fn run_aborted(&self, error: &RestartError) {
        self.structured.run_aborted(error);
    }
}

/// Prints which platform a command targets.
pub(crate) fn write_platform<W: Write>(
    out: &mut W,
    profile: &PlatformProfile,
    detected: Option<&DetectedPlatform>,
) -> io::Result<()> {
    if let Some(detected) = detected {
        writeln!(
            out,
            "Auto-detected platform {} ({})",
            detected.name, detected.reason
        )?;
    }
    writeln!(
        out,
        "Platform: {} [{}], PM2 home {}",
        profile.display_name(),
        profile.name(),
        profile.pm2_home()
    )
}

/// Prints the expected and observed counts of a finished run.
pub(crate) fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    let result = &summary.result;
    writeln!(
        out,
        "Expected: {} online, {} stopped ({} total)",
        result.expected_online,
        result.expected_stopped,
        result.expected_total()
    )?;
    writeln!(
        out,
        "Actual:   {} online, {} stopped ({} total)",
        result.actual_online,
        result.actual_stopped,
        result.actual_total()
    )?;
    if !result.drift.is_empty() {
        writeln!(out, "Drift:")?;
        for drift in &result.drift {
            writeln!(out, "  - {drift}")?;
        }
    }
    let left_online = result.left_online();
    if !left_online.is_empty() {
        writeln!(out, "Left online: {}", left_online.join(", "))?;
    }
    if let Some(timeout) = &result.unsettled {
        writeln!(out, "Unsettled: {timeout}")?;
    }
    writeln!(out, "Result: {}", summary.outcome())?;
    writeln!(out, "Saved state: {}", summary.snapshot_path.display())
}

/// Prints what `save` wrote.
pub(crate) fn write_saved<W: Write>(
    out: &mut W,
    snapshot: &StateSnapshot,
    state_file: &Path,
    latest: &Path,
    dump: &Path,
) -> io::Result<()> {
    writeln!(
        out,
        "Saved {} processes: {} online, {} stopped",
        snapshot.len(),
        snapshot.expected_online(),
        snapshot.expected_stopped()
    )?;
    writeln!(out, "State file: {}", state_file.display())?;
    writeln!(out, "Latest:     {}", latest.display())?;
    writeln!(out, "PM2 dump:   {}", dump.display())
}

/// Prints the live process table followed by status counts.
pub(crate) fn write_process_table<W: Write>(
    out: &mut W,
    records: &[ProcessRecord],
    now_millis: u64,
) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No processes are registered with PM2");
    }
    writeln!(
        out,
        "{:>4}  {:<28} {:<10} {:>8}  {}",
        "ID", "NAME", "STATUS", "MEMORY", "UPTIME"
    )?;
    for record in records {
        writeln!(
            out,
            "{:>4}  {:<28} {:<10} {:>8}  {}",
            record.id,
            record.name,
            record.status,
            memory_label(record.memory_bytes),
            uptime_label(record, now_millis)
        )?;
    }
    let count = |status: ProcessStatus| records.iter().filter(|r| r.status == status).count();
    writeln!(
        out,
        "online: {}  stopped: {}  errored: {}  total: {}",
        count(ProcessStatus::Online),
        count(ProcessStatus::Stopped),
        count(ProcessStatus::Errored),
        records.len()
    )
}

fn memory_label(bytes: Option<u64>) -> String {
    bytes.map_or_else(
        || String::from("-"),
        |bytes| format!("{} MB", bytes / BYTES_PER_MB),
    )
}

fn uptime_label(record: &ProcessRecord, now_millis: u64) -> String {
    match record.started_at {
        Some(started) if record.status.is_online() => {
            format_duration(now_millis.saturating_sub(started) / 1000)
        }
        _ => String::from("-"),
    }
}

fn format_duration(seconds: u64) -> String {
    let (days, hours, minutes) = (seconds / 86_400, seconds / 3_600 % 24, seconds / 60 % 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Prints saved state files, newest first, marking the newest.
pub(crate) fn write_state_files<W: Write>(
    out: &mut W,
    home: &Path,
    files: &[StateFileInfo],
) -> Result<(), AppError> {
    if files.is_empty() {
        writeln!(out, "No saved state files in {}", home.display())?;
        return Ok(());
    }
    for (index, file) in files.iter().enumerate() {
        let marker = if index == 0 { '*' } else { ' ' };
        let modified = OffsetDateTime::from(file.modified).format(&Rfc3339)?;
        writeln!(
            out,
            "{marker} {modified}  {:>9} B  {}",
            file.size,
            file.path.display()
        )?;
    }
    writeln!(out, "* latest")?;
    Ok(())
}
