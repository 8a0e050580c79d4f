//! `warden restart`: restart the daemon and restore every process's state.

use std::io::Write;
use std::process::ExitCode;

use warden_config::restart_snapshot_path;
use warden_engine::{RestartOrchestrator, RunGuard};

use super::{CommandContext, SupervisorFactory, epoch_millis};
use crate::AppError;
use crate::output::{ConsoleReporter, write_summary};

pub(super) fn run<F, W>(
    context: &CommandContext<'_, F>,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    context.paths.prepare()?;
    let _guard = RunGuard::acquire(context.paths.lock_path())?;
    let snapshot_path = restart_snapshot_path(epoch_millis());

    let reporter = ConsoleReporter::new(&mut *stdout);
    let summary = RestartOrchestrator::new(context.settings(), &reporter)
        .restart(context.supervisor(), &snapshot_path);
    drop(reporter);

    write_summary(stdout, &summary?)?;
    Ok(ExitCode::SUCCESS)
}
