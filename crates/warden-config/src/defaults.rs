use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default PM2 executable, resolved through `PATH`.
pub const DEFAULT_PM2_BINARY: &str = "pm2";

/// Directory scanned for checked-out platforms when none is given.
pub const DEFAULT_PLATFORMS_DIR: &str = "platforms";

/// Delay between killing the PM2 daemon and resurrecting it.
pub const DEFAULT_COOLING_DELAY_MS: u64 = 3_000;

/// Upper bound on waiting for the fleet to settle after resurrection.
pub const DEFAULT_STABILIZATION_TIMEOUT_MS: u64 = 30_000;

/// Interval between process listings while waiting for the fleet to settle.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned PM2 binary name.
pub fn default_pm2_binary() -> String {
    DEFAULT_PM2_BINARY.to_string()
}

/// Default directory scanned for platform checkouts.
pub fn default_platforms_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PLATFORMS_DIR)
}
