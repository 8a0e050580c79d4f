//! Command-line runtime for the warden tool.
//!
//! The runner splits configuration flags from the command, loads layered
//! configuration, installs logging, and dispatches to a command. Streams,
//! the configuration loader, and the supervisor factory are all injectable
//! so the whole runtime can be exercised from tests without a PM2 install.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod commands;
mod config;
mod errors;
mod output;
mod telemetry;

use cli::Cli;
use commands::{Pm2Factory, SupervisorFactory};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use errors::report_failure;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `warden_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--pm2-binary",
    "--pm2-home",
    "--platforms-dir",
    "--cooling-delay-ms",
    "--stabilization-timeout-ms",
    "--poll-interval-ms",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader, F: SupervisorFactory> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    factory: &'a F,
}

impl<'a, W, E, L, F> CliRunner<'a, W, E, L, F>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: SupervisorFactory,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L, factory: &'a F) -> Self {
        Self {
            io,
            loader,
            factory,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if is_informational(&error) => {
                let _ = write!(self.io.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                report_failure(self.io.stderr, &AppError::CliUsage(error));
                return ExitCode::FAILURE;
            }
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                commands::execute(cli.command, &config, self.factory, &mut *self.io.stdout)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                tracing::error!(target: "warden::cli", error = %error, "command failed");
                report_failure(self.io.stderr, &error);
                ExitCode::FAILURE
            }
        }
    }
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader, &Pm2Factory)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let program = args.first().cloned();
    let command = args.get(split.command_start..).unwrap_or_default();
    program.into_iter().chain(command.iter().cloned()).collect()
}

/// Runs the CLI with a custom configuration loader and supervisor factory.
pub(crate) fn run_with_loader<'a, I, W, E, L, F>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    factory: &'a F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: SupervisorFactory,
{
    CliRunner::new(io, loader, factory).run(args)
}

#[cfg(test)]
mod tests;
