use std::path::PathBuf;

use thiserror::Error;

use crate::model::config::ConfigOverrides;

pub const USAGE: &str = "\
Usage: adf-stage [OPTIONS] <COMMAND>

Commands:
  stage        Stage the media player sources into the generated project
  post-build   Run the post-build hooks scheduled for the configured board
  plan         Print the build plan (defines, options, SDK components) as TOML
  validate     Check board, framework and platform configuration
  boards       List supported boards
  help         Show this message

Options:
  --workdir <DIR>       Firmware project directory (default: config or .)
  --config <FILE>       Project config file (default: <workdir>/adf-stage.toml)
  --board <NAME>        ESP-ADF board, overrides config
  --source <DIR>        stage: source directory override
  --destination <DIR>   stage: destination directory override
  -v, --verbose         Debug logging";

/// Parsed command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stage {
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
    },
    PostBuild,
    Plan,
    Validate,
    Boards,
    Help,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub command: Command,
    pub overrides: ConfigOverrides,
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("no command given")]
    MissingCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {0} requires a value")]
    MissingValue(String),

    #[error("option {option} is only valid for {command}")]
    Misplaced { option: String, command: String },
}

impl Cli {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut command_name: Option<String> = None;
        let mut overrides = ConfigOverrides::default();
        let mut verbose = false;
        let mut source = None;
        let mut destination = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-v" | "--verbose" => verbose = true,
                "-h" | "--help" => command_name = Some("help".to_string()),
                "--workdir" => overrides.working_dir = Some(value(&mut args, &arg)?.into()),
                "--config" => overrides.config_file = Some(value(&mut args, &arg)?.into()),
                "--board" => overrides.board = Some(value(&mut args, &arg)?),
                "--source" => source = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--destination" => destination = Some(PathBuf::from(value(&mut args, &arg)?)),
                other if other.starts_with('-') => {
                    return Err(CliError::UnknownOption(other.to_string()));
                }
                other => {
                    if command_name.is_none() {
                        command_name = Some(other.to_string());
                    } else {
                        return Err(CliError::UnknownCommand(other.to_string()));
                    }
                }
            }
        }

        let name = command_name.ok_or(CliError::MissingCommand)?;
        let command = match name.as_str() {
            "stage" => Command::Stage {
                source: source.take(),
                destination: destination.take(),
            },
            "post-build" => Command::PostBuild,
            "plan" => Command::Plan,
            "validate" => Command::Validate,
            "boards" => Command::Boards,
            "help" => Command::Help,
            _ => return Err(CliError::UnknownCommand(name)),
        };

        if source.is_some() || destination.is_some() {
            let option = if source.is_some() { "--source" } else { "--destination" };
            return Err(CliError::Misplaced {
                option: option.to_string(),
                command: "stage".to_string(),
            });
        }

        Ok(Self {
            command,
            overrides,
            verbose,
        })
    }
}

fn value(args: &mut impl Iterator<Item = String>, option: &str) -> Result<String, CliError> {
    args.next()
        .filter(|v| !v.starts_with('-'))
        .ok_or_else(|| CliError::MissingValue(option.to_string()))
}
