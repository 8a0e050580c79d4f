//! Single-run lock held while a restart or restore touches the fleet.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::Builder;
use thiserror::Error;
use tracing::{info, warn};

const GUARD_TARGET: &str = "warden::guard";

/// Errors raised while taking the run lock.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another live process holds the lock.
    #[error("another warden run (pid {pid}) holds {path}; wait for it to finish")]
    AlreadyRunning {
        /// Pid recorded in the lock.
        pid: u32,
        /// Lock path.
        path: PathBuf,
    },
    /// The lock file could not be created.
    #[error("failed to create lock file {path}: {source}")]
    Create {
        /// Lock path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale lock could not be removed.
    #[error("failed to remove stale lock file {path}: {source}")]
    Cleanup {
        /// Lock path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the recorded pid failed.
    #[error("failed to check whether pid {pid} is alive: {source}")]
    CheckProcess {
        /// Pid recorded in the lock.
        pid: u32,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
}

/// Holds the run lock until dropped.
#[derive(Debug)]
pub struct RunGuard {
    path: PathBuf,
    _lock: File,
}

impl RunGuard {
    /// Takes the lock at `path`, clearing it first when its owner is dead.
    pub fn acquire(path: &Path) -> Result<Self, GuardError> {
        let lock = acquire_lock(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: GUARD_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove lock file"
                );
            }
            _ => {}
        }
    }
}

/// Publishes a fully written lock with a no-clobber link, so a lock file is
/// never observed before its pid is in it.
fn acquire_lock(path: &Path) -> Result<File, GuardError> {
    let create_error = |source: io::Error| GuardError::Create {
        path: path.to_path_buf(),
        source,
    };
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = Builder::new()
        .prefix(".warden-lock")
        .tempfile_in(directory)
        .map_err(create_error)?;
    writeln!(staged, "{}", std::process::id())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(create_error)?;
    match staged.persist_noclobber(path) {
        Ok(file) => {
            info!(target: GUARD_TARGET, file = %path.display(), "acquired run lock");
            Ok(file)
        }
        Err(error) if error.error.kind() == io::ErrorKind::AlreadyExists => {
            handle_existing_lock(path)
        }
        Err(error) => Err(create_error(error.error)),
    }
}

/// Locks are published whole, so one without a readable pid is debris from
/// an older tool or a damaged disk and is cleared like a dead owner's.
fn handle_existing_lock(path: &Path) -> Result<File, GuardError> {
    if let Some(pid) = read_pid(path)
        && process_alive(pid)?
    {
        info!(target: GUARD_TARGET, pid, "refusing to run: lock owner alive");
        return Err(GuardError::AlreadyRunning {
            pid,
            path: path.to_path_buf(),
        });
    }
    warn!(target: GUARD_TARGET, file = %path.display(), "removing stale run lock");
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(GuardError::Cleanup {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    acquire_lock(path)
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse::<u32>().ok()
}

fn process_alive(pid: u32) -> Result<bool, GuardError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    if raw == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(GuardError::CheckProcess { pid, source }),
    }
}
