// JAWS CLI - headless sector merge and PiN analytics

mod exit_codes;
mod merge;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use merge::{MergeArgs, ThresholdArgs};

#[derive(Parser)]
#[command(name = "jaws")]
#[command(about = "Merge sector PiN/Severity tables onto a template and flag rows")]
#[command(version)]
#[command(long_version = long_version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every ready sector onto the template and compute rankings
    #[command(after_help = "\
Examples:
  jaws merge merge.toml
  jaws merge merge.toml --format xlsx --output-dir out/
  jaws merge merge.toml --threshold-second 75 --json")]
    Merge(MergeArgs),

    /// Validate a manifest without loading any data
    #[command(after_help = "\
Examples:
  jaws validate merge.toml")]
    Validate {
        /// Path to the merge manifest (.toml)
        manifest: PathBuf,
    },

    /// Print the formulas behind every derived column
    #[command(after_help = "\
Examples:
  jaws formulas
  jaws formulas --threshold-second 75 --threshold-third 60")]
    Formulas {
        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Run the merge and list the PiN table's columns
    #[command(after_help = "\
Examples:
  jaws columns merge.toml
  jaws columns merge.toml --json")]
    Columns {
        /// Path to the merge manifest (.toml)
        manifest: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  jaws-merge ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Logs go to stderr. `JAWS_LOG` wins over `RUST_LOG`; default `warn`.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("JAWS_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            eprintln!("Usage: jaws <command> [options]");
            eprintln!("       jaws --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Merge(args)) => merge::cmd_merge(args),
        Some(Commands::Validate { manifest }) => merge::cmd_validate(manifest),
        Some(Commands::Formulas { thresholds, json }) => merge::cmd_formulas(thresholds, json),
        Some(Commands::Columns { manifest, json }) => merge::cmd_columns(manifest, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
