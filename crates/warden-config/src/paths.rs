//! Derives the artefact paths written inside a PM2 home.
//!
//! Saved snapshots, the latest-snapshot pointer, and the run lock all live
//! next to PM2's own `dump.pm2` so an operator inspecting the home directory
//! finds every artefact in one place.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::PlatformProfile;

/// Prefix of snapshot files written by `save`.
pub const STATE_FILE_PREFIX: &str = "custom_state_";
/// Extension of snapshot files.
pub const STATE_FILE_SUFFIX: &str = ".json";
/// Pointer to the most recently saved snapshot.
pub const LATEST_STATE_FILE: &str = "latest_custom_state.json";
/// Lock guarding a single restart or restore run per PM2 home.
pub const LOCK_FILE: &str = "warden.lock";
/// PM2's own process dump replayed by resurrection.
pub const DUMP_FILE: &str = "dump.pm2";

/// Canonical paths for artefacts stored in a PM2 home.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pm2_home: PathBuf,
    latest_state_path: PathBuf,
    lock_path: PathBuf,
    dump_path: PathBuf,
}

impl StatePaths {
    /// Derives the layout for the given platform.
    #[must_use]
    pub fn for_profile(profile: &PlatformProfile) -> Self {
        Self::new(profile.pm2_home().as_std_path())
    }

    /// Derives the layout for an arbitrary PM2 home.
    #[must_use]
    pub fn new(pm2_home: &Path) -> Self {
        Self {
            latest_state_path: pm2_home.join(LATEST_STATE_FILE),
            lock_path: pm2_home.join(LOCK_FILE),
            dump_path: pm2_home.join(DUMP_FILE),
            pm2_home: pm2_home.to_path_buf(),
        }
    }

    /// Creates the PM2 home when it does not exist yet.
    pub fn prepare(&self) -> Result<(), StatePathsError> {
        fs::create_dir_all(&self.pm2_home).map_err(|source| StatePathsError::Home {
            path: self.pm2_home.clone(),
            source,
        })
    }

    /// PM2 home directory.
    #[must_use]
    pub fn pm2_home(&self) -> &Path {
        self.pm2_home.as_path()
    }

    /// Pointer to the latest saved snapshot.
    #[must_use]
    pub fn latest_state_path(&self) -> &Path {
        self.latest_state_path.as_path()
    }

    /// Run lock path.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// PM2 dump file path.
    #[must_use]
    pub fn dump_path(&self) -> &Path {
        self.dump_path.as_path()
    }

    /// Path of a snapshot file with the given file name.
    #[must_use]
    pub fn state_file(&self, file_name: &str) -> PathBuf {
        self.pm2_home.join(file_name)
    }

    /// Timestamped snapshot file name, e.g. `custom_state_2024-05-01T10-20-30.json`.
    #[must_use]
    pub fn timestamped_file_name(stamp: &str) -> String {
        format!("{STATE_FILE_PREFIX}{stamp}{STATE_FILE_SUFFIX}")
    }

    /// Whether a directory entry name looks like a saved snapshot.
    #[must_use]
    pub fn is_state_file_name(name: &str) -> bool {
        name.starts_with(STATE_FILE_PREFIX) && name.ends_with(STATE_FILE_SUFFIX)
    }
}

/// Temporary snapshot written before a daemon restart tears the fleet down.
#[must_use]
pub fn restart_snapshot_path(epoch_millis: u128) -> PathBuf {
    env::temp_dir().join(format!("warden-restart-{epoch_millis}.json"))
}

/// Errors raised while preparing the PM2 home.
#[derive(Debug, Error)]
pub enum StatePathsError {
    /// Creating the PM2 home failed.
    #[error("failed to prepare PM2 home '{path}': {source}")]
    Home {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
