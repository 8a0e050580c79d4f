//! Platform profiles and active-platform detection.
//!
//! A platform names one PM2 installation. Each profile maps the name to the
//! PM2 home directory whose daemon socket and dump file the tooling operates
//! on. The platform only selects the target; it never changes the algorithm.

use std::fmt;
use std::io;
use std::path::Path;

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use thiserror::Error;

use crate::Config;

/// Platform used when nothing else can be determined.
pub const DEFAULT_PLATFORM: &str = "staging";

struct BuiltinProfile {
    name: &'static str,
    display_name: &'static str,
    pm2_home: &'static str,
}

const BUILTIN_PROFILES: &[BuiltinProfile] = &[BuiltinProfile {
    name: "staging",
    display_name: "Staging Environment",
    pm2_home: "/var/www/beamdevlive/.pm2",
}];

/// Names of the platforms with a built-in profile.
#[must_use]
pub fn supported_platforms() -> Vec<&'static str> {
    BUILTIN_PROFILES.iter().map(|profile| profile.name).collect()
}

/// A resolved platform: its name and the PM2 home it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    name: String,
    display_name: String,
    pm2_home: Utf8PathBuf,
}

impl PlatformProfile {
    /// Resolves `name` against the configuration and the built-in table.
    ///
    /// A configured `pm2_home` wins for any platform name, which lets
    /// operators target installations the table does not know about.
    pub fn resolve(name: &str, config: &Config) -> Result<Self, PlatformError> {
        let builtin = BUILTIN_PROFILES
            .iter()
            .find(|profile| profile.name == name);
        if let Some(home) = config.pm2_home() {
            let display_name = builtin
                .map(|profile| profile.display_name.to_owned())
                .unwrap_or_else(|| name.to_owned());
            return Ok(Self {
                name: name.to_owned(),
                display_name,
                pm2_home: home.to_path_buf(),
            });
        }
        match builtin {
            Some(profile) => Ok(Self {
                name: profile.name.to_owned(),
                display_name: profile.display_name.to_owned(),
                pm2_home: Utf8PathBuf::from(profile.pm2_home),
            }),
            None => Err(PlatformError::UnknownPlatform {
                name: name.to_owned(),
                supported: supported_platforms().join(", "),
            }),
        }
    }

    /// Platform name as typed by the operator.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable platform label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// PM2 home directory for this platform.
    #[must_use]
    pub fn pm2_home(&self) -> &camino::Utf8Path {
        &self.pm2_home
    }
}

/// Errors raised while resolving a platform profile.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform has no built-in profile and no PM2 home override exists.
    #[error("unknown platform: {name}. Supported platforms: {supported}")]
    UnknownPlatform {
        /// Requested platform.
        name: String,
        /// Comma-separated list of supported names.
        supported: String,
    },
}

/// Why [`detect_platform`] settled on its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionReason {
    /// The platforms directory does not exist.
    MissingDirectory,
    /// The platforms directory holds no subdirectories.
    NoPlatforms,
    /// Exactly one platform is checked out.
    SingleCandidate,
    /// Several platforms exist and the default one is among them.
    PreferredDefault,
    /// Several platforms exist without the default; the first sorted one wins.
    FirstCandidate,
    /// The directory could not be read.
    Unreadable(String),
}

impl fmt::Display for DetectionReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDirectory => formatter.write_str("platforms directory not found"),
            Self::NoPlatforms => formatter.write_str("no platforms found in platforms directory"),
            Self::SingleCandidate => formatter.write_str("single platform checked out"),
            Self::PreferredDefault => formatter.write_str("multiple platforms available"),
            Self::FirstCandidate => formatter.write_str("multiple platforms available"),
            Self::Unreadable(message) => write!(formatter, "error detecting platform: {message}"),
        }
    }
}

/// Result of platform auto-detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPlatform {
    /// Selected platform name.
    pub name: String,
    /// Rule that produced the selection.
    pub reason: DetectionReason,
}

impl DetectedPlatform {
    fn new(name: impl Into<String>, reason: DetectionReason) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }

    /// Whether detection fell back to the default without finding a checkout.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(
            self.reason,
            DetectionReason::MissingDirectory
                | DetectionReason::NoPlatforms
                | DetectionReason::Unreadable(_)
        )
    }
}

/// Picks the active platform from the checked-out platform directories.
///
/// Sparse checkouts usually leave a single platform on disk; when several are
/// present the default platform is preferred.
#[must_use]
pub fn detect_platform(platforms_dir: &Path) -> DetectedPlatform {
    let mut candidates = match list_platform_dirs(platforms_dir) {
        Ok(candidates) => candidates,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return DetectedPlatform::new(DEFAULT_PLATFORM, DetectionReason::MissingDirectory);
        }
        Err(error) => {
            return DetectedPlatform::new(
                DEFAULT_PLATFORM,
                DetectionReason::Unreadable(error.to_string()),
            );
        }
    };
    candidates.sort();
    match candidates.as_slice() {
        [] => DetectedPlatform::new(DEFAULT_PLATFORM, DetectionReason::NoPlatforms),
        [only] => DetectedPlatform::new(only.clone(), DetectionReason::SingleCandidate),
        [first, ..] => {
            if candidates.iter().any(|name| name == DEFAULT_PLATFORM) {
                DetectedPlatform::new(DEFAULT_PLATFORM, DetectionReason::PreferredDefault)
            } else {
                DetectedPlatform::new(first.clone(), DetectionReason::FirstCandidate)
            }
        }
    }
}

fn list_platform_dirs(platforms_dir: &Path) -> io::Result<Vec<String>> {
    let dir = Dir::open_ambient_dir(platforms_dir, ambient_authority())?;
    let mut names = Vec::new();
    for entry in dir.entries()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}
