//! `warden show`: print the live process table.

use std::io::Write;
use std::process::ExitCode;

use warden_engine::SupervisorSession;

use super::{CommandContext, SupervisorFactory, epoch_millis};
use crate::AppError;
use crate::output::write_process_table;

pub(super) fn run<F, W>(
    context: &CommandContext<'_, F>,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    let mut session = SupervisorSession::open(context.supervisor())?;
    let records = session.list()?;
    session.close();
    let now = u64::try_from(epoch_millis()).unwrap_or(u64::MAX);
    write_process_table(stdout, &records, now)?;
    Ok(ExitCode::SUCCESS)
}
