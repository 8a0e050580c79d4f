//! Managed process records as reported by the supervisor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a managed process.
///
/// `Other` keeps the raw supervisor string for statuses this crate does not
/// model explicitly (`launching`, `stopping`, `waiting restart`, ...), so a
/// status survives a round trip through a state file unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessStatus {
    /// Running and accepting work.
    Online,
    /// Stopped on request.
    Stopped,
    /// Crashed past the supervisor's restart budget.
    Errored,
    /// Any other supervisor status.
    Other(String),
}

impl ProcessStatus {
    /// Supervisor spelling of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the status is exactly `online`.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Whether the supervisor has finished transitioning the process.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Online | Self::Stopped | Self::Errored)
    }
}

impl From<String> for ProcessStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "online" => Self::Online,
            "stopped" => Self::Stopped,
            "errored" => Self::Errored,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for ProcessStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<ProcessStatus> for String {
    fn from(status: ProcessStatus) -> Self {
        match status {
            ProcessStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One process in the supervisor's process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Supervisor-assigned id. Stable within one daemon lifetime only;
    /// resurrection may hand out different ids.
    pub id: u32,
    /// Process name, the stable key across daemon restarts.
    pub name: String,
    /// Current status.
    pub status: ProcessStatus,
    /// Number of restarts the supervisor has performed.
    pub restart_time: u32,
    /// Registration time in milliseconds since the Unix epoch.
    pub created_at: Option<u64>,
    /// Last start time in milliseconds since the Unix epoch.
    pub started_at: Option<u64>,
    /// Resident memory in bytes, when the supervisor samples it.
    pub memory_bytes: Option<u64>,
}

impl ProcessRecord {
    /// Builds a record with only identity and status populated.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, status: impl Into<ProcessStatus>) -> Self {
        Self {
            id,
            name: name.into(),
            status: status.into(),
            restart_time: 0,
            created_at: None,
            started_at: None,
            memory_bytes: None,
        }
    }
}
