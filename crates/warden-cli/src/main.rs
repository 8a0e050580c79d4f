//! CLI entrypoint for the warden PM2 restart tooling.
//!
//! The binary delegates to [`warden_cli::run`], which loads configuration,
//! installs logging, resolves the target platform, and runs the requested
//! command against its PM2 daemon.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    warden_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
