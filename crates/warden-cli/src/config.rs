//! Configuration loading helpers for the warden CLI.
//!
//! Configuration flags are peeled off the front of the argument list and
//! handed to `ortho_config`; everything from the first command token onwards
//! is left for clap.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use warden_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// Configuration flags (listed in `CONFIG_CLI_FLAGS`) must appear before
    /// the subcommand. Flags after it are parsed as command arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if crate::CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

/// Separates leading configuration flags from the command tokens.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut consumed = 0usize;
    let mut expecting_value = false;
    for argument in rest {
        if expecting_value {
            config_arguments.push(argument.clone());
            expecting_value = false;
            consumed += 1;
            continue;
        }
        match classify_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                expecting_value = needs_value;
                consumed += 1;
            }
            FlagAction::Stop => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start: consumed + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate("--log-filter", FlagAction::Include { needs_value: true })]
    #[case::home("--pm2-home", FlagAction::Include { needs_value: true })]
    #[case::command("restart", FlagAction::Stop)]
    #[case::unknown("--name", FlagAction::Stop)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify_flag(OsStr::new(argument)), expected);
    }

    #[test]
    fn splits_leading_configuration_flags() {
        let args = os_args(&[
            "warden",
            "--pm2-home",
            "/srv/pm2",
            "--log-format=json",
            "save",
            "--name",
            "before.json",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&["warden", "--pm2-home", "/srv/pm2", "--log-format=json"])
        );
        assert_eq!(split.command_start, 4);
    }

    #[test]
    fn flags_after_the_command_stay_with_the_command() {
        let args = os_args(&["warden", "show", "--log-filter", "debug"]);
        let split = split_config_arguments(&args);
        assert_eq!(split.config_arguments, os_args(&["warden"]));
        assert_eq!(split.command_start, 1);
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
    }
}
