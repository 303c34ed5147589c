mod commands;

use clap::Parser;
use comodes_core::AfError;
use std::path::PathBuf;

/// Entry point for the installed binary: parse `std::env::args`, run,
/// and map every failure onto its diagnostic line and exit code.
pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let dataset_error = error.as_af_error();
            eprintln!("{}", dataset_error.diagnostic_line());
            dataset_error.exit_code()
        }
    }
}

/// In-process entry point used by tests: `args` excludes the program
/// name.
pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("comodes".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "comodes", about = "Inspect persisted coherent-mode decomposition datasets")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print the dataset digest as human-readable text
    Info {
        /// Dataset path (.h5 or .npz)
        dataset: PathBuf,

        /// List every mode with its occupation
        #[arg(long)]
        modes: bool,
    },
    /// Print the dataset digest as JSON
    Summary {
        /// Dataset path (.h5 or .npz)
        dataset: PathBuf,
    },
    /// Print mode occupations, or the mode index covering a threshold
    Occupation {
        /// Dataset path (.h5 or .npz)
        dataset: PathBuf,

        /// Report the first mode index whose cumulative occupation
        /// reaches this percentage instead of listing occupations
        #[arg(long)]
        up_to_percent: Option<f64>,
    },
    /// Fetch one mode field and print its digest
    Mode {
        /// Dataset path (.h5 or .npz)
        dataset: PathBuf,

        /// Mode index, counted from zero in stored order
        index: usize,
    },
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Info { dataset, modes } => commands::run_info_command(&dataset, modes),
        CliCommand::Summary { dataset } => commands::run_summary_command(&dataset),
        CliCommand::Occupation {
            dataset,
            up_to_percent,
        } => commands::run_occupation_command(&dataset, up_to_percent),
        CliCommand::Mode { dataset, index } => commands::run_mode_command(&dataset, index),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Dataset(AfError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AfError> for CliError {
    fn from(error: AfError) -> Self {
        Self::Dataset(error)
    }
}

impl CliError {
    fn as_af_error(&self) -> AfError {
        match self {
            Self::Usage(message) => {
                AfError::unsupported_format("INPUT.CLI_USAGE", message.clone())
            }
            Self::Dataset(error) => error.clone(),
            Self::Internal(error) => AfError::internal("IO.CLI", format!("{error:#}")),
        }
    }
}
