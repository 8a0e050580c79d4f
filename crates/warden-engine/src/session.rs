//! Explicit supervisor connection handle shared by one run.

use tracing::{debug, warn};
use warden_supervisor::{ProcessRecord, Supervisor, SupervisorError};

use crate::directory;

pub(crate) const SESSION_TARGET: &str = "warden::session";

/// Owns the supervisor for the duration of one run.
///
/// The session is created once, passed down to every phase, and closes the
/// connection when dropped so an aborted run never leaks it.
#[derive(Debug)]
pub struct SupervisorSession<S: Supervisor> {
    supervisor: S,
    connected: bool,
}

impl<S: Supervisor> SupervisorSession<S> {
    /// Connects to the supervisor.
    pub fn open(mut supervisor: S) -> Result<Self, SupervisorError> {
        supervisor.connect()?;
        debug!(target: SESSION_TARGET, "session opened");
        Ok(Self {
            supervisor,
            connected: true,
        })
    }

    /// Whether the underlying connection is currently open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Lists live processes in ascending id order.
    pub fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        directory::list(&mut self.supervisor)
    }

    /// Stops every managed process.
    pub fn stop_all(&mut self) -> Result<(), SupervisorError> {
        self.supervisor.stop_all()
    }

    /// Stops one process by name.
    pub fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.stop(name)
    }

    /// Persists the process table for the next resurrection.
    pub fn dump(&mut self) -> Result<(), SupervisorError> {
        self.supervisor.dump()
    }

    /// Terminates the daemon and disconnects whatever the outcome.
    ///
    /// The kill result is returned so the caller can decide whether a failure
    /// matters; the session is disconnected either way.
    pub fn kill_daemon(&mut self) -> Result<(), SupervisorError> {
        let result = self.supervisor.kill_daemon();
        self.disconnect();
        result
    }

    /// Reconnects when needed and replays the supervisor's saved dump.
    pub fn resurrect(&mut self) -> Result<(), SupervisorError> {
        if !self.connected {
            self.supervisor.connect()?;
            self.connected = true;
            debug!(target: SESSION_TARGET, "session reconnected");
        }
        self.supervisor.resurrect()
    }

    /// Closes the session explicitly.
    pub fn close(mut self) {
        self.disconnect();
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.supervisor.disconnect();
            self.connected = false;
            debug!(target: SESSION_TARGET, "session closed");
        }
    }
}

impl<S: Supervisor> Drop for SupervisorSession<S> {
    fn drop(&mut self) {
        if self.connected {
            warn!(
                target: SESSION_TARGET,
                "session dropped while connected; disconnecting"
            );
            self.disconnect();
        }
    }
}
