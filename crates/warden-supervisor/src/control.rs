//! The supervisor control trait and its error surface.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::record::ProcessRecord;

/// Supervisor operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Establish the control connection.
    Connect,
    /// Enumerate the process table.
    List,
    /// Stop every managed process.
    StopAll,
    /// Stop one process by name.
    Stop,
    /// Terminate the supervisor daemon.
    KillDaemon,
    /// Relaunch processes from the saved dump.
    Resurrect,
    /// Persist the process table for later resurrection.
    Dump,
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connect => "connect to PM2",
            Self::List => "get process list",
            Self::StopAll => "stop all processes",
            Self::Stop => "stop process",
            Self::KillDaemon => "kill PM2 daemon",
            Self::Resurrect => "resurrect processes",
            Self::Dump => "save PM2 dump",
        };
        formatter.write_str(text)
    }
}

/// Errors raised by supervisor calls.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The supervisor could not be reached.
    #[error("failed to connect to PM2: {message}")]
    Unavailable {
        /// Diagnostic reported by the supervisor or transport.
        message: String,
    },
    /// A call was issued on a handle that is not connected.
    #[error("cannot {operation}: supervisor handle is not connected")]
    NotConnected {
        /// Operation that was attempted.
        operation: Operation,
    },
    /// The supervisor rejected or failed the request.
    #[error("failed to {operation}: {message}")]
    CommandFailed {
        /// Operation that failed.
        operation: Operation,
        /// Exit status of the control command, when one was produced.
        status: Option<i32>,
        /// Diagnostic reported by the supervisor.
        message: String,
    },
    /// The control executable could not be launched.
    #[error("failed to launch '{binary}' to {operation}: {source}")]
    Spawn {
        /// Executable that failed to launch.
        binary: String,
        /// Operation that was attempted.
        operation: Operation,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The process listing was not valid JSON.
    #[error("failed to parse process listing: {source}")]
    MalformedListing {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The process listing output held no JSON array at all.
    #[error("process listing output did not contain a JSON array")]
    MissingListing,
}

impl SupervisorError {
    /// Whether the error means the supervisor could not be reached at all.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Spawn { .. })
    }
}

/// Request/response control API of a process supervisor.
///
/// Calls are blocking with a single call in flight. Implementations do not
/// enforce deadlines; a hung supervisor hangs the caller.
pub trait Supervisor {
    /// Establishes the control connection, starting the daemon if required.
    fn connect(&mut self) -> Result<(), SupervisorError>;

    /// Closes the control connection. Never fails, even when the daemon has
    /// already exited.
    fn disconnect(&mut self);

    /// Lists the process table in supervisor order.
    fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError>;

    /// Stops every managed process.
    fn stop_all(&mut self) -> Result<(), SupervisorError>;

    /// Stops the process with the given name.
    fn stop(&mut self, name: &str) -> Result<(), SupervisorError>;

    /// Terminates the supervisor daemon itself.
    fn kill_daemon(&mut self) -> Result<(), SupervisorError>;

    /// Relaunches every process recorded in the last dump.
    fn resurrect(&mut self) -> Result<(), SupervisorError>;

    /// Persists the current process table for later resurrection.
    fn dump(&mut self) -> Result<(), SupervisorError>;
}

impl<S> Supervisor for &mut S
where
    S: Supervisor + ?Sized,
{
    fn connect(&mut self) -> Result<(), SupervisorError> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        (**self).list()
    }

    fn stop_all(&mut self) -> Result<(), SupervisorError> {
        (**self).stop_all()
    }

    fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        (**self).stop(name)
    }

    fn kill_daemon(&mut self) -> Result<(), SupervisorError> {
        (**self).kill_daemon()
    }

    fn resurrect(&mut self) -> Result<(), SupervisorError> {
        (**self).resurrect()
    }

    fn dump(&mut self) -> Result<(), SupervisorError> {
        (**self).dump()
    }
}
