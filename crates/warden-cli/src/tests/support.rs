//! Harness types for driving the CLI runtime against an in-memory fleet.

use std::cell::RefCell;
use std::ffi::OsString;
use std::process::ExitCode;
use std::rc::Rc;

use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;
use warden_config::{Config, PlatformProfile};
use warden_supervisor::{Operation, ProcessRecord, ProcessStatus, Supervisor, SupervisorError};

use crate::commands::SupervisorFactory;
use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Debug, Default)]
struct FleetState {
    processes: Vec<ProcessRecord>,
    dump: Vec<ProcessRecord>,
    unavailable: bool,
    refused_stops: Vec<String>,
    resurrect_fails: bool,
    next_id: u32,
    calls: Vec<String>,
}

/// Shared in-memory PM2 daemon; every handle built by the factory sees the
/// same process table.
#[derive(Debug, Clone, Default)]
pub(super) struct Fleet {
    state: Rc<RefCell<FleetState>>,
}

impl Fleet {
    pub(super) fn with_processes(rows: &[(&str, &str)]) -> Self {
        let processes: Vec<ProcessRecord> = rows
            .iter()
            .zip(0u32..)
            .map(|((name, status), id)| ProcessRecord::new(id, *name, *status))
            .collect();
        let next_id = u32::try_from(processes.len()).expect("small fleet");
        Self {
            state: Rc::new(RefCell::new(FleetState {
                dump: processes.clone(),
                processes,
                next_id,
                ..FleetState::default()
            })),
        }
    }

    pub(super) fn make_unavailable(&self) {
        self.state.borrow_mut().unavailable = true;
    }

    /// Makes every `stop` of `name` fail.
    pub(super) fn refuse_stop(&self, name: &str) {
        self.state.borrow_mut().refused_stops.push(name.to_owned());
    }

    pub(super) fn fail_resurrection(&self) {
        self.state.borrow_mut().resurrect_fails = true;
    }

    pub(super) fn set_status(&self, name: &str, status: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.processes.iter_mut().find(|record| record.name == name) {
            record.status = ProcessStatus::from(status);
        }
    }

    pub(super) fn status_of(&self, name: &str) -> Option<String> {
        self.state
            .borrow()
            .processes
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.status.to_string())
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn log(&self, call: &str) {
        self.state.borrow_mut().calls.push(call.to_owned());
    }
}

impl Supervisor for Fleet {
    fn connect(&mut self) -> Result<(), SupervisorError> {
        self.log("connect");
        if self.state.borrow().unavailable {
            return Err(SupervisorError::Unavailable {
                message: String::from("connect ENOENT /srv/pm2/rpc.sock"),
            });
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log("disconnect");
    }

    fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        self.log("list");
        Ok(self.state.borrow().processes.clone())
    }

    fn stop_all(&mut self) -> Result<(), SupervisorError> {
        self.log("stop_all");
        for record in &mut self.state.borrow_mut().processes {
            record.status = ProcessStatus::Stopped;
        }
        Ok(())
    }

    fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.log(&format!("stop {name}"));
        let mut state = self.state.borrow_mut();
        if state.refused_stops.iter().any(|refused| refused == name) {
            return Err(SupervisorError::CommandFailed {
                operation: Operation::Stop,
                status: Some(1),
                message: String::from("stop rejected by daemon"),
            });
        }
        let record = state
            .processes
            .iter_mut()
            .find(|record| record.name == name)
            .ok_or_else(|| SupervisorError::CommandFailed {
                operation: Operation::Stop,
                status: Some(1),
                message: String::from("process or namespace not found"),
            })?;
        record.status = ProcessStatus::Stopped;
        Ok(())
    }

    fn kill_daemon(&mut self) -> Result<(), SupervisorError> {
        self.log("kill_daemon");
        self.state.borrow_mut().processes.clear();
        Ok(())
    }

    fn resurrect(&mut self) -> Result<(), SupervisorError> {
        self.log("resurrect");
        let mut state = self.state.borrow_mut();
        if state.resurrect_fails {
            return Err(SupervisorError::CommandFailed {
                operation: Operation::Resurrect,
                status: Some(1),
                message: String::from("dump file is corrupted"),
            });
        }
        let dumped = state.dump.clone();
        for record in dumped {
            if let Some(live) = state
                .processes
                .iter_mut()
                .find(|live| live.name == record.name)
            {
                live.status = ProcessStatus::Online;
                continue;
            }
            let id = state.next_id;
            state.next_id += 1;
            state
                .processes
                .push(ProcessRecord::new(id, record.name, ProcessStatus::Online));
        }
        Ok(())
    }

    fn dump(&mut self) -> Result<(), SupervisorError> {
        self.log("dump");
        let mut state = self.state.borrow_mut();
        state.dump = state.processes.clone();
        Ok(())
    }
}

impl SupervisorFactory for Fleet {
    type Handle = Self;

    fn supervisor(&self, _config: &Config, _profile: &PlatformProfile) -> Self::Handle {
        self.clone()
    }
}

/// Captured result of one CLI invocation.
pub(super) struct Invocation {
    pub(super) exit: ExitCode,
    pub(super) stdout: String,
    pub(super) stderr: String,
}

/// Temporary PM2 home plus a configuration pointing at it.
pub(super) struct Workspace {
    pub(super) dir: TempDir,
    pub(super) config: Config,
}

impl Workspace {
    pub(super) fn home(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("pm2")).expect("utf8 temp path")
    }

    pub(super) fn run(&self, fleet: &Fleet, args: &[&str]) -> Invocation {
        let loader = StaticConfigLoader {
            config: self.config.clone(),
        };
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = {
            let mut io = IoStreams::new(&mut stdout, &mut stderr);
            let args = std::iter::once("warden")
                .chain(args.iter().copied())
                .map(OsString::from);
            run_with_loader(args, &mut io, &loader, fleet)
        };
        Invocation {
            exit,
            stdout: String::from_utf8(stdout).expect("stdout utf8"),
            stderr: String::from_utf8(stderr).expect("stderr utf8"),
        }
    }
}

#[fixture]
pub(super) fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp path");
    let config = Config {
        log_filter: String::from("off"),
        pm2_home: Some(root.join("pm2")),
        platforms_dir: root.join("platforms"),
        cooling_delay_ms: 0,
        stabilization_timeout_ms: 200,
        poll_interval_ms: 1,
        ..Config::default()
    };
    Workspace { dir, config }
}
