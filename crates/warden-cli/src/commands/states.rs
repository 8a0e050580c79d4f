//! `warden states`: list saved state files.

use std::io::Write;
use std::process::ExitCode;

use warden_engine::list_state_files;

use super::{CommandContext, SupervisorFactory};
use crate::AppError;
use crate::output::write_state_files;

pub(super) fn run<F, W>(
    context: &CommandContext<'_, F>,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    let files = list_state_files(&context.paths)?;
    write_state_files(stdout, context.paths.pm2_home(), &files)?;
    Ok(ExitCode::SUCCESS)
}
