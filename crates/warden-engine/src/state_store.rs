//! Reading and writing snapshot state files.
//!
//! A state file is a pretty-printed JSON array of
//! `{ id, name, status, restart_time, created_at }` objects in ascending id
//! order. Files written by older tooling key the id as `pm_id`; both
//! spellings are accepted on read.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::Builder;
use thiserror::Error;
use tracing::info;
use warden_config::StatePaths;
use warden_supervisor::{ProcessRecord, ProcessStatus};

use crate::snapshot::{SnapshotError, StateSnapshot};

const STORE_TARGET: &str = "warden::state";

#[derive(Debug, Serialize, Deserialize)]
struct StateFileEntry {
    #[serde(alias = "pm_id")]
    id: u32,
    name: String,
    status: ProcessStatus,
    #[serde(default)]
    restart_time: u32,
    #[serde(default)]
    created_at: Option<u64>,
}

impl From<&ProcessRecord> for StateFileEntry {
    fn from(record: &ProcessRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            status: record.status.clone(),
            restart_time: record.restart_time,
            created_at: record.created_at,
        }
    }
}

impl From<StateFileEntry> for ProcessRecord {
    fn from(entry: StateFileEntry) -> Self {
        let mut record = Self::new(entry.id, entry.name, entry.status);
        record.restart_time = entry.restart_time;
        record.created_at = entry.created_at;
        record
    }
}

/// Errors raised while persisting or loading state files.
#[derive(Debug, Error)]
pub enum StateFileError {
    /// The requested state file does not exist.
    #[error("state file not found: {path}")]
    Missing {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Reading the file failed.
    #[error("failed to read state file {path}: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the file failed.
    #[error("failed to write state file {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid state array.
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising the snapshot failed.
    #[error("failed to serialise snapshot: {0}")]
    Serialise(#[source] serde_json::Error),
    /// The file holds duplicate names.
    #[error("state file {path} is not a valid snapshot: {source}")]
    Snapshot {
        /// File being loaded.
        path: PathBuf,
        /// Snapshot validation error.
        #[source]
        source: SnapshotError,
    },
    /// Updating the latest-state pointer failed.
    #[error("failed to update latest state pointer {path}: {source}")]
    Pointer {
        /// Pointer path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Listing the PM2 home failed.
    #[error("failed to list state files in {path}: {source}")]
    List {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Writes `snapshot` to `path` atomically.
pub fn write_state_file(path: &Path, snapshot: &StateSnapshot) -> Result<(), StateFileError> {
    let entries: Vec<StateFileEntry> = snapshot
        .entries()
        .iter()
        .map(|entry| StateFileEntry::from(entry.record()))
        .collect();
    let mut payload = serde_json::to_vec_pretty(&entries).map_err(StateFileError::Serialise)?;
    payload.push(b'\n');
    atomic_write(path, &payload).map_err(|source| StateFileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        target: STORE_TARGET,
        file = %path.display(),
        processes = entries.len(),
        "state file written"
    );
    Ok(())
}

/// Loads a snapshot from `path`.
///
/// The capture time is taken from the file's modification time.
pub fn read_state_file(path: &Path) -> Result<StateSnapshot, StateFileError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StateFileError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            StateFileError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let entries: Vec<StateFileEntry> =
        serde_json::from_str(&content).map_err(|source| StateFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let captured_at = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map(millis_since_epoch)
        .unwrap_or_default();
    let records = entries.into_iter().map(ProcessRecord::from).collect();
    StateSnapshot::from_records(records, captured_at).map_err(|source| StateFileError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}

/// Repoints the latest-state pointer at `target`.
///
/// On Unix the pointer is a relative symlink so the home can be moved; other
/// platforms get a copy.
pub fn point_latest(paths: &StatePaths, target: &Path) -> Result<(), StateFileError> {
    let pointer = paths.latest_state_path();
    let pointer_error = |source| StateFileError::Pointer {
        path: pointer.to_path_buf(),
        source,
    };
    match fs::remove_file(pointer) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(pointer_error(error)),
    }
    #[cfg(unix)]
    {
        let relative = if target.parent() == Some(paths.pm2_home()) {
            target.file_name().map_or_else(|| target.to_path_buf(), PathBuf::from)
        } else {
            target.to_path_buf()
        };
        std::os::unix::fs::symlink(&relative, pointer).map_err(pointer_error)?;
    }
    #[cfg(not(unix))]
    {
        fs::copy(target, pointer).map_err(pointer_error)?;
    }
    info!(
        target: STORE_TARGET,
        pointer = %pointer.display(),
        file = %target.display(),
        "latest state pointer updated"
    );
    Ok(())
}

/// Metadata about one saved state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFileInfo {
    /// Full path.
    pub path: PathBuf,
    /// File name within the PM2 home.
    pub file_name: String,
    /// Last modification time.
    pub modified: SystemTime,
    /// Size in bytes.
    pub size: u64,
}

/// Lists saved state files, newest first.
///
/// A missing PM2 home yields an empty list.
pub fn list_state_files(paths: &StatePaths) -> Result<Vec<StateFileInfo>, StateFileError> {
    let home = paths.pm2_home();
    let list_error = |source| StateFileError::List {
        path: home.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(home) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(list_error(error)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(list_error)?;
        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !StatePaths::is_state_file_name(&file_name) {
            continue;
        }
        let metadata = entry.metadata().map_err(list_error)?;
        if !metadata.is_file() {
            continue;
        }
        files.push(StateFileInfo {
            path: entry.path(),
            file_name,
            modified: metadata.modified().map_err(list_error)?,
            size: metadata.len(),
        });
    }
    files.sort_by(|left, right| {
        right
            .modified
            .cmp(&left.modified)
            .then_with(|| right.file_name.cmp(&left.file_name))
    });
    Ok(files)
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Writes bytes to `path` through a synced temporary file and a rename, so
/// readers never observe a partial state file.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "state file path has no parent directory",
        )
    })?;
    let mut builder = Builder::new();
    builder.prefix(".warden-state");
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o600));
    }
    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
