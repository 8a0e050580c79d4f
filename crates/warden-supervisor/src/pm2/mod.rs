//! [`Supervisor`] implementation backed by the `pm2` executable.

mod listing;
mod runner;

use std::path::{Path, PathBuf};

use tracing::debug;

pub use self::listing::parse_listing;
pub use self::runner::{CommandOutput, CommandRunner, SystemRunner};
use crate::control::{Operation, Supervisor, SupervisorError};
use crate::record::ProcessRecord;

const LOG_TARGET: &str = "warden::supervisor";

/// Drives PM2 through its command line against one `PM2_HOME`.
///
/// PM2 offers no persistent connection over its CLI, so `connect` verifies
/// the daemon answers `pm2 ping` (which spawns it when absent) and the
/// handle then tracks connection state itself. Calls made while
/// disconnected fail with [`SupervisorError::NotConnected`].
#[derive(Debug)]
pub struct Pm2Cli<R = SystemRunner> {
    binary: String,
    home: PathBuf,
    runner: R,
    connected: bool,
}

impl Pm2Cli<SystemRunner> {
    /// Creates a handle that spawns `binary` with `PM2_HOME` set to `home`.
    #[must_use]
    pub fn new(binary: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, home, SystemRunner)
    }
}

impl<R: CommandRunner> Pm2Cli<R> {
    /// Creates a handle using a custom command runner.
    #[must_use]
    pub fn with_runner(binary: impl Into<String>, home: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            home: home.into(),
            runner,
            connected: false,
        }
    }

    /// PM2 home directory this handle targets.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Whether `connect` succeeded and `disconnect` has not been called.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    fn execute(
        &self,
        operation: Operation,
        args: &[&str],
    ) -> Result<CommandOutput, SupervisorError> {
        debug!(
            target: LOG_TARGET,
            binary = %self.binary,
            args = ?args,
            pm2_home = %self.home.display(),
            "running pm2 command"
        );
        let output = self
            .runner
            .run(&self.binary, args, &self.home)
            .map_err(|source| SupervisorError::Spawn {
                binary: self.binary.clone(),
                operation,
                source,
            })?;
        if output.succeeded() {
            return Ok(output);
        }
        Err(SupervisorError::CommandFailed {
            operation,
            status: output.status,
            message: output.diagnostic(),
        })
    }

    fn execute_connected(
        &self,
        operation: Operation,
        args: &[&str],
    ) -> Result<CommandOutput, SupervisorError> {
        if !self.connected {
            return Err(SupervisorError::NotConnected { operation });
        }
        self.execute(operation, args)
    }
}

impl<R: CommandRunner> Supervisor for Pm2Cli<R> {
    fn connect(&mut self) -> Result<(), SupervisorError> {
        match self.execute(Operation::Connect, &["ping"]) {
            Ok(_) => {
                self.connected = true;
                debug!(target: LOG_TARGET, "connected to pm2");
                Ok(())
            }
            Err(SupervisorError::CommandFailed { message, .. }) => {
                Err(SupervisorError::Unavailable { message })
            }
            Err(other) => Err(other),
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            debug!(target: LOG_TARGET, "disconnected from pm2");
        }
        self.connected = false;
    }

    fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        let output = self.execute_connected(Operation::List, &["jlist"])?;
        parse_listing(&output.stdout)
    }

    fn stop_all(&mut self) -> Result<(), SupervisorError> {
        self.execute_connected(Operation::StopAll, &["stop", "all"])
            .map(drop)
    }

    fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.execute_connected(Operation::Stop, &["stop", name])
            .map(drop)
    }

    fn kill_daemon(&mut self) -> Result<(), SupervisorError> {
        self.execute_connected(Operation::KillDaemon, &["kill"])
            .map(drop)
    }

    fn resurrect(&mut self) -> Result<(), SupervisorError> {
        self.execute_connected(Operation::Resurrect, &["resurrect"])
            .map(drop)
    }

    fn dump(&mut self) -> Result<(), SupervisorError> {
        self.execute_connected(Operation::Dump, &["save"]).map(drop)
    }
}
