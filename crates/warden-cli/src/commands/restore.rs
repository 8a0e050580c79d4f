//! `warden restore`: resurrect the dump and restore a saved state file.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use warden_engine::{RestartOrchestrator, RunGuard, StateFileError, read_state_file};

use super::{CommandContext, SupervisorFactory};
use crate::AppError;
use crate::output::{ConsoleReporter, write_summary};

pub(super) fn run<F, W>(
    context: &CommandContext<'_, F>,
    file: Option<PathBuf>,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    let path = file.unwrap_or_else(|| context.paths.latest_state_path().to_path_buf());
    let snapshot = read_state_file(&path).map_err(|error| match error {
        StateFileError::Missing { path } => AppError::StateFileMissing { path },
        other => AppError::StateFile(other),
    })?;
    writeln!(
        stdout,
        "Restoring {} processes ({} online, {} stopped) from {}",
        snapshot.len(),
        snapshot.expected_online(),
        snapshot.expected_stopped(),
        path.display()
    )?;

    let _guard = RunGuard::acquire(context.paths.lock_path())?;
    let reporter = ConsoleReporter::new(&mut *stdout);
    let summary = RestartOrchestrator::new(context.settings(), &reporter).restore(
        context.supervisor(),
        snapshot,
        &path,
    );
    drop(reporter);

    write_summary(stdout, &summary?)?;
    Ok(ExitCode::SUCCESS)
}
