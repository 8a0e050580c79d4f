//! In-memory supervisor that behaves like a small PM2 daemon.

use warden_supervisor::{
    Operation, ProcessRecord, ProcessStatus, Supervisor, SupervisorError,
};

/// Scriptable supervisor double.
///
/// The fake keeps a process table and a dump. Killing the daemon empties the
/// table; resurrecting relaunches every dumped process online under fresh
/// ids, which mirrors how PM2 reshuffles ids across a daemon restart.
#[derive(Debug, Default)]
pub struct FakeSupervisor {
    processes: Vec<ProcessRecord>,
    dump: Vec<ProcessRecord>,
    connected: bool,
    unavailable: bool,
    calls: Vec<String>,
    list_calls: usize,
    failing_stops: Vec<String>,
    fail_kill: bool,
    fail_resurrect: bool,
    fail_lists_after: Option<usize>,
    failing_lists: usize,
    settle_after: Option<usize>,
    lost_on_resurrect: Vec<String>,
    resurrect_ids_from: Option<u32>,
}

impl FakeSupervisor {
    /// Builds a running daemon whose dump matches its table.
    pub fn with_processes(rows: &[(u32, &str, &str)]) -> Self {
        let processes: Vec<ProcessRecord> = rows
            .iter()
            .map(|(id, name, status)| super::record(*id, name, status))
            .collect();
        Self {
            dump: processes.clone(),
            processes,
            ..Self::default()
        }
    }

    /// Builds a supervisor that refuses connections.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn add_process(&mut self, id: u32, name: &str, status: &str) {
        let record = super::record(id, name, status);
        self.dump.push(record.clone());
        self.processes.push(record);
    }

    pub fn fail_stop(&mut self, name: &str) {
        self.failing_stops.push(name.to_owned());
    }

    pub fn fail_kill(&mut self) {
        self.fail_kill = true;
    }

    pub fn fail_resurrect(&mut self) {
        self.fail_resurrect = true;
    }

    /// Every listing after the first `successful` ones fails.
    pub fn fail_list_after(&mut self, successful: usize) {
        self.fail_lists_after = Some(successful);
    }

    /// The next `count` listings fail, later ones succeed.
    pub fn fail_next_lists(&mut self, count: usize) {
        self.failing_lists = count;
    }

    /// Transitional statuses turn online once `count` listings have been served.
    pub fn settle_after_lists(&mut self, count: usize) {
        self.settle_after = Some(count);
    }

    pub fn lose_on_resurrect(&mut self, name: &str) {
        self.lost_on_resurrect.push(name.to_owned());
    }

    pub fn resurrect_ids_from(&mut self, first: u32) {
        self.resurrect_ids_from = Some(first);
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub const fn list_calls(&self) -> usize {
        self.list_calls
    }

    pub fn status_of(&self, name: &str) -> Option<String> {
        self.processes
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.status.as_str().to_owned())
    }

    fn require_connection(&self, operation: Operation) -> Result<(), SupervisorError> {
        if self.connected {
            Ok(())
        } else {
            Err(SupervisorError::NotConnected { operation })
        }
    }

    fn refuse(operation: Operation, message: &str) -> SupervisorError {
        SupervisorError::CommandFailed {
            operation,
            status: Some(1),
            message: message.to_owned(),
        }
    }
}

impl Supervisor for FakeSupervisor {
    fn connect(&mut self) -> Result<(), SupervisorError> {
        self.calls.push(String::from("connect"));
        if self.unavailable {
            return Err(SupervisorError::Unavailable {
                message: String::from("connect ECONNREFUSED"),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push(String::from("disconnect"));
        self.connected = false;
    }

    fn list(&mut self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        self.calls.push(String::from("list"));
        self.require_connection(Operation::List)?;
        self.list_calls += 1;
        if self.failing_lists > 0 {
            self.failing_lists -= 1;
            return Err(Self::refuse(Operation::List, "daemon not ready"));
        }
        if self
            .fail_lists_after
            .is_some_and(|successful| self.list_calls > successful)
        {
            return Err(Self::refuse(Operation::List, "listing failed"));
        }
        if self
            .settle_after
            .is_some_and(|count| self.list_calls > count)
        {
            for record in &mut self.processes {
                if !record.status.is_settled() {
                    record.status = ProcessStatus::Online;
                }
            }
        }
        Ok(self.processes.clone())
    }

    fn stop_all(&mut self) -> Result<(), SupervisorError> {
        self.calls.push(String::from("stop_all"));
        self.require_connection(Operation::StopAll)?;
        for record in &mut self.processes {
            record.status = ProcessStatus::Stopped;
        }
        Ok(())
    }

    fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.calls.push(format!("stop {name}"));
        self.require_connection(Operation::Stop)?;
        if self.failing_stops.iter().any(|failing| failing == name) {
            return Err(Self::refuse(Operation::Stop, "stop rejected"));
        }
        let record = self
            .processes
            .iter_mut()
            .find(|record| record.name == name)
            .ok_or_else(|| Self::refuse(Operation::Stop, "process or namespace not found"))?;
        record.status = ProcessStatus::Stopped;
        Ok(())
    }

    fn kill_daemon(&mut self) -> Result<(), SupervisorError> {
        self.calls.push(String::from("kill_daemon"));
        self.require_connection(Operation::KillDaemon)?;
        if self.fail_kill {
            return Err(Self::refuse(Operation::KillDaemon, "kill rejected"));
        }
        self.processes.clear();
        Ok(())
    }

    fn resurrect(&mut self) -> Result<(), SupervisorError> {
        self.calls.push(String::from("resurrect"));
        self.require_connection(Operation::Resurrect)?;
        if self.fail_resurrect {
            return Err(Self::refuse(Operation::Resurrect, "dump file is corrupt"));
        }
        let mut next_id = self.resurrect_ids_from.unwrap_or_else(|| {
            self.processes
                .iter()
                .map(|record| record.id + 1)
                .max()
                .unwrap_or_default()
        });
        for dumped in &self.dump {
            if self.lost_on_resurrect.contains(&dumped.name) {
                continue;
            }
            if let Some(live) = self
                .processes
                .iter_mut()
                .find(|record| record.name == dumped.name)
            {
                live.status = ProcessStatus::Online;
                continue;
            }
            let mut relaunched = dumped.clone();
            relaunched.id = next_id;
            relaunched.status = ProcessStatus::Online;
            next_id += 1;
            self.processes.push(relaunched);
        }
        Ok(())
    }

    fn dump(&mut self) -> Result<(), SupervisorError> {
        self.calls.push(String::from("dump"));
        self.require_connection(Operation::Dump)?;
        self.dump = self.processes.clone();
        Ok(())
    }
}
