//! Shared configuration for the warden tooling.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a TOML
//! file (`--config-path` or `WARDEN_CONFIG_PATH`), then `WARDEN_*` environment
//! variables, then command-line flags. The crate also owns the platform
//! profile table and the on-disk layout of state files inside a PM2 home so
//! every command agrees on where snapshots live.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod paths;
mod platform;

pub use defaults::{
    DEFAULT_COOLING_DELAY_MS, DEFAULT_LOG_FILTER, DEFAULT_PLATFORMS_DIR, DEFAULT_PM2_BINARY,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_STABILIZATION_TIMEOUT_MS, default_log_filter,
    default_log_filter_string, default_log_format, default_platforms_dir, default_pm2_binary,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{
    DUMP_FILE, LATEST_STATE_FILE, LOCK_FILE, STATE_FILE_PREFIX, STATE_FILE_SUFFIX, StatePaths,
    StatePathsError, restart_snapshot_path,
};
pub use platform::{
    DEFAULT_PLATFORM, DetectedPlatform, DetectionReason, PlatformError, PlatformProfile,
    detect_platform, supported_platforms,
};

/// Resolved configuration for a warden invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// Tracing filter expression, for example `info` or `warden=debug`.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format (`compact` or `json`).
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// PM2 executable used to drive the supervisor.
    #[ortho_config(default = defaults::default_pm2_binary())]
    pub pm2_binary: String,
    /// Explicit PM2 home, overriding the platform profile table.
    pub pm2_home: Option<Utf8PathBuf>,
    /// Directory scanned when auto-detecting the active platform.
    #[ortho_config(default = defaults::default_platforms_dir())]
    pub platforms_dir: Utf8PathBuf,
    /// Milliseconds to wait after killing the daemon.
    #[ortho_config(default = defaults::DEFAULT_COOLING_DELAY_MS)]
    pub cooling_delay_ms: u64,
    /// Milliseconds allowed for the fleet to settle after resurrection.
    #[ortho_config(default = defaults::DEFAULT_STABILIZATION_TIMEOUT_MS)]
    pub stabilization_timeout_ms: u64,
    /// Milliseconds between listings while waiting for the fleet to settle.
    #[ortho_config(default = defaults::DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            pm2_binary: default_pm2_binary(),
            pm2_home: None,
            platforms_dir: default_platforms_dir(),
            cooling_delay_ms: DEFAULT_COOLING_DELAY_MS,
            stabilization_timeout_ms: DEFAULT_STABILIZATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// PM2 executable name or path.
    #[must_use]
    pub fn pm2_binary(&self) -> &str {
        &self.pm2_binary
    }

    /// PM2 home override, if configured.
    #[must_use]
    pub fn pm2_home(&self) -> Option<&Utf8Path> {
        self.pm2_home.as_deref()
    }

    /// Directory scanned for platform checkouts.
    #[must_use]
    pub fn platforms_dir(&self) -> &Utf8Path {
        &self.platforms_dir
    }

    /// Delay between killing the daemon and resurrecting it.
    #[must_use]
    pub const fn cooling_delay(&self) -> Duration {
        Duration::from_millis(self.cooling_delay_ms)
    }

    /// Deadline for the post-resurrection settle poll.
    #[must_use]
    pub const fn stabilization_timeout(&self) -> Duration {
        Duration::from_millis(self.stabilization_timeout_ms)
    }

    /// Interval between settle polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings_match_reference_delays() {
        let config = Config::default();
        assert_eq!(config.cooling_delay(), Duration::from_secs(3));
        assert_eq!(config.stabilization_timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn default_config_has_no_home_override() {
        let config = Config::default();
        assert!(config.pm2_home().is_none());
        assert_eq!(config.pm2_binary(), "pm2");
        assert_eq!(config.platforms_dir(), Utf8Path::new("platforms"));
    }
}
