//! Parsing of `pm2 jlist` output.

use serde::Deserialize;

use crate::control::SupervisorError;
use crate::record::{ProcessRecord, ProcessStatus};

#[derive(Debug, Deserialize)]
struct Pm2Process {
    pm_id: u32,
    name: String,
    #[serde(default)]
    pm2_env: Pm2Env,
    #[serde(default)]
    monit: Option<Pm2Monit>,
}

#[derive(Debug, Default, Deserialize)]
struct Pm2Env {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    restart_time: u32,
    #[serde(default)]
    created_at: Option<u64>,
    #[serde(default)]
    pm_uptime: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Pm2Monit {
    #[serde(default)]
    memory: Option<u64>,
}

impl From<Pm2Process> for ProcessRecord {
    fn from(process: Pm2Process) -> Self {
        let status = process
            .pm2_env
            .status
            .map_or_else(|| ProcessStatus::Other(String::from("unknown")), ProcessStatus::from);
        Self {
            id: process.pm_id,
            name: process.name,
            status,
            restart_time: process.pm2_env.restart_time,
            created_at: process.pm2_env.created_at,
            started_at: process.pm2_env.pm_uptime,
            memory_bytes: process.monit.and_then(|monit| monit.memory),
        }
    }
}

/// Parses the stdout of `pm2 jlist` into process records.
///
/// PM2 may print banner lines (daemon spawn notices, version warnings)
/// before the JSON array. Every line that opens with `[` is tried in order
/// and the first one that parses as a process array wins; trailing output
/// after the array is ignored.
pub fn parse_listing(stdout: &str) -> Result<Vec<ProcessRecord>, SupervisorError> {
    let mut last_error = None;
    let mut offset = 0usize;
    for line in stdout.split_inclusive('\n') {
        let leading = line.len() - line.trim_start().len();
        if line.trim_start().starts_with('[') {
            let candidate = stdout.get(offset + leading..).unwrap_or_default();
            let mut stream =
                serde_json::Deserializer::from_str(candidate).into_iter::<Vec<Pm2Process>>();
            match stream.next() {
                Some(Ok(processes)) => {
                    return Ok(processes.into_iter().map(ProcessRecord::from).collect());
                }
                Some(Err(error)) => last_error = Some(error),
                None => {}
            }
        }
        offset += line.len();
    }
    match last_error {
        Some(source) => Err(SupervisorError::MalformedListing { source }),
        None => Err(SupervisorError::MissingListing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"[{"pid":4242,"name":"api","pm_id":3,"monit":{"memory":52428800,"cpu":0.4},"pm2_env":{"status":"online","restart_time":2,"created_at":1700000000000,"pm_uptime":1700000500000}},{"pid":0,"name":"worker","pm_id":1,"monit":{"memory":0,"cpu":0},"pm2_env":{"status":"stopped","restart_time":0,"created_at":1700000000100}}]"#;

    #[test]
    fn parses_records_in_supervisor_order() {
        let records = parse_listing(LISTING).expect("listing parses");
        assert_eq!(records.len(), 2);
        let api = records.first().expect("first record");
        assert_eq!(api.id, 3);
        assert_eq!(api.name, "api");
        assert_eq!(api.status, ProcessStatus::Online);
        assert_eq!(api.restart_time, 2);
        assert_eq!(api.memory_bytes, Some(52_428_800));
        assert_eq!(api.started_at, Some(1_700_000_500_000));
        let worker = records.get(1).expect("second record");
        assert_eq!(worker.status, ProcessStatus::Stopped);
        assert_eq!(worker.started_at, None);
    }

    #[test]
    fn skips_banner_lines() {
        let output = format!(
            "[PM2] Spawning PM2 daemon with pm2_home=/tmp/pm2\n[PM2] PM2 Successfully daemonized\n{LISTING}\n"
        );
        let records = parse_listing(&output).expect("listing parses after banner");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn empty_array_is_an_empty_fleet() {
        let records = parse_listing("[]\n").expect("empty listing parses");
        assert!(records.is_empty());
    }

    #[test]
    fn missing_status_is_reported_as_unknown() {
        let records =
            parse_listing(r#"[{"name":"cron","pm_id":0,"pm2_env":{}}]"#).expect("listing parses");
        let cron = records.first().expect("record");
        assert_eq!(cron.status, ProcessStatus::Other(String::from("unknown")));
    }

    #[test]
    fn output_without_array_is_rejected() {
        let error = parse_listing("PM2 not ready\n").expect_err("must fail");
        assert!(matches!(error, SupervisorError::MissingListing));
    }

    #[test]
    fn truncated_array_is_malformed() {
        let error = parse_listing(r#"[{"name":"api","pm_id":"#).expect_err("must fail");
        assert!(matches!(error, SupervisorError::MalformedListing { .. }));
    }
}
