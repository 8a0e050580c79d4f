//! Execution seam for the `pm2` executable.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured result of one control command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, absent when the command was killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Best diagnostic line for a failed command.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_owned();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_owned();
        }
        match self.status {
            Some(code) => format!("exited with status {code}"),
            None => String::from("terminated by signal"),
        }
    }
}

/// Runs a control command against a PM2 home.
pub trait CommandRunner {
    /// Executes `program` with `args`, pointing `PM2_HOME` at `pm2_home`.
    fn run(&self, program: &str, args: &[&str], pm2_home: &Path) -> io::Result<CommandOutput>;
}

/// Runner that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], pm2_home: &Path) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .env("PM2_HOME", pm2_home)
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
