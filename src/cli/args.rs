//! Command line arguments.
//!
//! Running without a subcommand is the same as `check`. Version strings,
//! snapshot path, and timeout can also come from the environment.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fabric-precheck")]
#[command(version, about = "Pre-upgrade health checks for fabric controllers")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub check: CheckArgs,
}

impl Args {
    /// Subcommand to run, defaulting to `check` with the top-level options
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Check(self.check))
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Run prechecks (default)
    Check(CheckArgs),
    /// List all available checks
    List,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct CheckArgs {
    /// Version running on the fabric today, e.g. 5.2(3g)
    #[arg(long = "current", value_name = "VERSION", env = "FABRIC_PRECHECK_CURRENT_VERSION")]
    pub current_version: Option<String>,

    /// Version to upgrade to, e.g. 6.0(2h)
    #[arg(long = "target", value_name = "VERSION", env = "FABRIC_PRECHECK_TARGET_VERSION")]
    pub target_version: Option<String>,

    /// Inventory snapshot (JSON object keyed by resource id)
    #[arg(long, value_name = "FILE", env = "FABRIC_PRECHECK_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Run only this check (repeatable)
    #[arg(long, value_name = "ID", conflicts_with = "skip")]
    pub only: Vec<String>,

    /// Skip this check (repeatable)
    #[arg(long, value_name = "ID")]
    pub skip: Vec<String>,

    /// Global timeout for inventory checks in milliseconds
    #[arg(long = "timeout", value_name = "MS", default_value_t = 30000, env = "FABRIC_PRECHECK_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Inventory checks in flight at once
    #[arg(long, value_name = "N", default_value_t = 16)]
    pub max_parallel: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "FABRIC_PRECHECK_LOG_JSON")]
    pub log_json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
