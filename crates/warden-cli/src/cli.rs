//! CLI argument definitions for the warden tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Restarts a PM2 daemon without losing which processes were stopped.
#[derive(Parser, Debug)]
#[command(name = "warden", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Restarts the PM2 daemon and restores every process's prior state.
    Restart {
        /// Platform to operate on; auto-detected when omitted.
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
    },
    /// Saves the current process states to a file in the PM2 home.
    Save {
        /// Platform to operate on; auto-detected when omitted.
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
        /// File name to write instead of a timestamped one.
        #[arg(long, value_name = "FILE")]
        name: Option<String>,
    },
    /// Resurrects the daemon's dump and restores a saved state file.
    Restore {
        /// Platform to operate on; auto-detected when omitted.
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
        /// State file to restore; defaults to the latest saved one.
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Shows the live process table.
    Show {
        /// Platform to operate on; auto-detected when omitted.
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
    },
    /// Lists saved state files, newest first.
    States {
        /// Platform to operate on; auto-detected when omitted.
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
    },
}

impl CliCommand {
    /// Platform named on the command line, if any.
    pub(crate) fn platform(&self) -> Option<&str> {
        match self {
            Self::Restart { platform }
            | Self::Save { platform, .. }
            | Self::Restore { platform, .. }
            | Self::Show { platform }
            | Self::States { platform } => platform.as_deref(),
        }
    }
}
