//! Control surface of the external process supervisor.
//!
//! The warden tooling never runs services itself. It observes and toggles the
//! processes owned by a supervisor daemon (PM2) through the [`Supervisor`]
//! trait. [`Pm2Cli`] implements the trait by driving the `pm2` executable
//! against a chosen `PM2_HOME`; tests substitute in-memory supervisors.

mod control;
mod pm2;
mod record;

pub use control::{Operation, Supervisor, SupervisorError};
pub use pm2::{CommandOutput, CommandRunner, Pm2Cli, SystemRunner, parse_listing};
pub use record::{ProcessRecord, ProcessStatus};
