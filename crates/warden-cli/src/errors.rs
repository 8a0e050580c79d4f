//! Error types and operator diagnostics for the CLI runtime.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use warden_config::{PlatformError, StatePathsError};
use warden_engine::{GuardError, RestartError, SnapshotError, StateFileError};
use warden_supervisor::SupervisorError;

use crate::telemetry::TelemetryError;

/// Generic checks printed after every fatal error.
pub(crate) const TROUBLESHOOTING: &[&str] = &[
    "check the daemon with `pm2 status`",
    "inspect recent output with `pm2 logs`",
    "verify you can read and write the PM2 home",
];

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Paths(#[from] StatePathsError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    StateFile(#[from] StateFileError),
    #[error("no saved state file at {}", path.display())]
    StateFileMissing { path: PathBuf },
    #[error(transparent)]
    Restart(#[from] RestartError),
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

impl AppError {
    /// Targeted remediation, when one is known.
    pub(crate) const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Restart(error) => Some(error.hint()),
            Self::Platform(_) => {
                Some("pass a supported platform or set `pm2_home` to target another installation")
            }
            Self::Guard(GuardError::AlreadyRunning { .. }) => {
                Some("wait for the other run to finish before retrying")
            }
            Self::Supervisor(error) if error.is_unavailable() => {
                Some("check that PM2 is installed and its daemon is reachable")
            }
            Self::Snapshot(SnapshotError::DuplicateName { .. }) => {
                Some("give every PM2 process a unique name and retry")
            }
            Self::StateFileMissing { .. } => {
                Some("run `warden save` first or pass `--file` with an existing state file")
            }
            _ => None,
        }
    }

    /// Whether the operator should see the generic troubleshooting list.
    const fn is_operational(&self) -> bool {
        !matches!(
            self,
            Self::LoadConfiguration(_) | Self::CliUsage(_) | Self::Telemetry(_)
        )
    }
}

/// Writes an error, its hint, and the troubleshooting checklist.
pub(crate) fn report_failure<E: Write>(stderr: &mut E, error: &AppError) {
    if let AppError::CliUsage(usage) = error {
        // clap renders its own `error:` prefix and usage block.
        let _ = write!(stderr, "{usage}");
        return;
    }
    let _ = writeln!(stderr, "error: {error}");
    if let Some(hint) = error.hint() {
        let _ = writeln!(stderr, "hint: {hint}");
    }
    if error.is_operational() {
        let _ = writeln!(stderr, "troubleshooting:");
        for step in TROUBLESHOOTING {
            let _ = writeln!(stderr, "  - {step}");
        }
    }
}
