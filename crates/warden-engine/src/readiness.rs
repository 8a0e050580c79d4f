//! Waits for a resurrected fleet to settle before it is reconciled.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;
use warden_supervisor::{ProcessRecord, Supervisor};

use crate::SupervisorSession;
use crate::snapshot::StateSnapshot;

const READINESS_TARGET: &str = "warden::readiness";

/// Bounds for the settle poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizationPolicy {
    /// Give up after this long.
    pub timeout: Duration,
    /// Pause between listings.
    pub poll_interval: Duration,
    /// Identical consecutive listings that count as settled when snapshot
    /// processes are missing.
    pub stable_polls: u32,
}

impl StabilizationPolicy {
    /// Default number of identical listings.
    pub const DEFAULT_STABLE_POLLS: u32 = 2;

    /// Builds a policy with the default stable-poll count.
    #[must_use]
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            stable_polls: Self::DEFAULT_STABLE_POLLS,
        }
    }
}

/// The fleet did not settle before the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("process list did not settle within {waited_ms} ms ({detail})")]
pub struct StabilizationTimeout {
    /// Configured deadline in milliseconds.
    pub waited_ms: u64,
    /// Last thing observed before giving up.
    pub detail: String,
}

/// Polls the live table until it settles.
///
/// A listing is settled when no process is mid-transition and either every
/// snapshot name is present or the listing has not changed for
/// `stable_polls` consecutive polls. Listing errors while the daemon boots
/// are retried until the deadline. Returns the settled listing, or the
/// timeout once the deadline passes; callers carry on either way.
pub fn wait_for_settled<S: Supervisor>(
    session: &mut SupervisorSession<S>,
    snapshot: &StateSnapshot,
    policy: StabilizationPolicy,
) -> Result<Vec<ProcessRecord>, StabilizationTimeout> {
    let deadline = Instant::now() + policy.timeout;
    let mut previous: Option<Vec<(String, String)>> = None;
    let mut unchanged = 0u32;
    let mut detail;
    loop {
        match session.list() {
            Ok(records) => {
                let fingerprint = fingerprint(&records);
                unchanged = if previous.as_ref() == Some(&fingerprint) {
                    unchanged.saturating_add(1)
                } else {
                    1
                };
                let transitional = records
                    .iter()
                    .filter(|record| !record.status.is_settled())
                    .count();
                let missing = snapshot
                    .names()
                    .filter(|name| !records.iter().any(|record| record.name == *name))
                    .count();
                debug!(
                    target: READINESS_TARGET,
                    listed = records.len(),
                    transitional,
                    missing,
                    unchanged,
                    "polled process list"
                );
                if transitional == 0 && (missing == 0 || unchanged >= policy.stable_polls) {
                    return Ok(records);
                }
                detail = format!(
                    "{} listed, {transitional} transitioning, {missing} missing",
                    records.len()
                );
                previous = Some(fingerprint);
            }
            Err(error) => {
                debug!(
                    target: READINESS_TARGET,
                    error = %error,
                    "process list unavailable; retrying"
                );
                detail = error.to_string();
                previous = None;
                unchanged = 0;
            }
        }
        if Instant::now() >= deadline {
            return Err(StabilizationTimeout {
                waited_ms: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
                detail,
            });
        }
        thread::sleep(policy.poll_interval);
    }
}

fn fingerprint(records: &[ProcessRecord]) -> Vec<(String, String)> {
    records
        .iter()
        .map(|record| (record.name.clone(), record.status.as_str().to_owned()))
        .collect()
}
