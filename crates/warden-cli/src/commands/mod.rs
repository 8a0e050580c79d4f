//! Command implementations dispatched by the runner.

use std::io::Write;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use warden_config::{Config, DetectedPlatform, PlatformProfile, StatePaths, detect_platform};
use warden_engine::{RestartSettings, StabilizationPolicy};
use warden_supervisor::{Pm2Cli, Supervisor};

use crate::AppError;
use crate::cli::CliCommand;
use crate::output::write_platform;

mod restart;
mod restore;
mod save;
mod show;
mod states;

/// Builds the supervisor handle a command talks to.
pub(crate) trait SupervisorFactory {
    type Handle: Supervisor;

    fn supervisor(&self, config: &Config, profile: &PlatformProfile) -> Self::Handle;
}

/// Drives the `pm2` executable configured for the platform.
pub(crate) struct Pm2Factory;

impl SupervisorFactory for Pm2Factory {
    type Handle = Pm2Cli;

    fn supervisor(&self, config: &Config, profile: &PlatformProfile) -> Self::Handle {
        Pm2Cli::new(config.pm2_binary(), profile.pm2_home().as_std_path())
    }
}

/// Everything a command needs to act on one platform.
pub(crate) struct CommandContext<'a, F: SupervisorFactory> {
    pub(crate) config: &'a Config,
    pub(crate) profile: PlatformProfile,
    pub(crate) paths: StatePaths,
    pub(crate) factory: &'a F,
}

impl<F: SupervisorFactory> CommandContext<'_, F> {
    pub(crate) fn supervisor(&self) -> F::Handle {
        self.factory.supervisor(self.config, &self.profile)
    }

    pub(crate) const fn settings(&self) -> RestartSettings {
        RestartSettings {
            cooling_delay: self.config.cooling_delay(),
            stabilization: StabilizationPolicy::new(
                self.config.stabilization_timeout(),
                self.config.poll_interval(),
            ),
        }
    }
}

/// Resolves the platform, prints it, and runs `command`.
pub(crate) fn execute<F, W>(
    command: CliCommand,
    config: &Config,
    factory: &F,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    F: SupervisorFactory,
    W: Write,
{
    let (profile, detected) = resolve_platform(command.platform(), config)?;
    write_platform(stdout, &profile, detected.as_ref())?;
    let context = CommandContext {
        config,
        paths: StatePaths::for_profile(&profile),
        profile,
        factory,
    };
    match command {
        CliCommand::Restart { .. } => restart::run(&context, stdout),
        CliCommand::Save { name, .. } => save::run(&context, name.as_deref(), stdout),
        CliCommand::Restore { file, .. } => restore::run(&context, file, stdout),
        CliCommand::Show { .. } => show::run(&context, stdout),
        CliCommand::States { .. } => states::run(&context, stdout),
    }
}

fn resolve_platform(
    requested: Option<&str>,
    config: &Config,
) -> Result<(PlatformProfile, Option<DetectedPlatform>), AppError> {
    if let Some(name) = requested {
        return Ok((PlatformProfile::resolve(name, config)?, None));
    }
    let detected = detect_platform(config.platforms_dir().as_std_path());
    if detected.is_fallback() {
        tracing::warn!(
            target: "warden::cli",
            platform = %detected.name,
            reason = %detected.reason,
            "no platform checkout found; using the default platform"
        );
    }
    let profile = PlatformProfile::resolve(&detected.name, config)?;
    Ok((profile, Some(detected)))
}

pub(crate) fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
