//! `warden save`: persist the current process states in the PM2 home.

use std::io::Write;
use std::process::ExitCode;

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use warden_config::StatePaths;
use warden_engine::{SupervisorSession, capture, point_latest, write_state_file};

use super::{CommandContext, SupervisorFactory};
use crate::AppError;
use crate::output::write_saved;

const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]");

pub(super) fn run<F, W>(
    context: &CommandContext<'_, F>,
    name: Option<&str>,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    let file_name = match name {
        Some(name) => name.to_owned(),
        None => StatePaths::timestamped_file_name(&timestamp(OffsetDateTime::now_utc())?),
    };
    let state_file = context.paths.state_file(&file_name);

    let mut session = SupervisorSession::open(context.supervisor())?;
    let snapshot = capture(&mut session)?;
    context.paths.prepare()?;
    write_state_file(&state_file, &snapshot)?;
    point_latest(&context.paths, &state_file)?;
    session.dump()?;
    session.close();

    write_saved(
        stdout,
        &snapshot,
        &state_file,
        context.paths.latest_state_path(),
        context.paths.dump_path(),
    )?;
    Ok(ExitCode::SUCCESS)
}

fn timestamp(now: OffsetDateTime) -> Result<String, time::error::Format> {
    now.format(STAMP_FORMAT)
}
