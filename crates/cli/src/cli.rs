//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MMS Workflow - sensor ingestion and matchup runs over a host pool
#[derive(Parser, Debug)]
#[command(
    name = "mms-workflow",
    author,
    version,
    about = "Satellite sensor ingestion and matchup scheduler",
    long_about = "Launches ingestion or matchup runs described by a workflow descriptor.\n\n\
                  Registers the sensors, loads the usecase rules, slices the common \n\
                  validity interval into windows and spreads the jobs over the hosts."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MMS_WORKFLOW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MMS_WORKFLOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a run
    Run(RunArgs),

    /// Validate a descriptor and its usecase without running
    Validate(ValidateArgs),

    /// List the jobs a run would execute
    Plan(PlanArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the workflow descriptor (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "workflow.toml",
        env = "MMS_WORKFLOW_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the descriptor's run mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Root of the observation archive (<root>/<sensor>/<version>/*.jsonl)
    #[arg(long, env = "MMS_ARCHIVE_ROOT", conflicts_with = "synthetic")]
    pub archive: Option<PathBuf>,

    /// Read synthetic ground-track observations instead of an archive
    #[arg(long)]
    pub synthetic: bool,

    /// Directory for JSON Lines output (default: the usecase's output path,
    /// else log summary only)
    #[arg(short, long, env = "MMS_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Override the descriptor's retry limit
    #[arg(long)]
    pub retry_limit: Option<u32>,

    /// Override the per-job timeout in seconds
    #[arg(long)]
    pub job_timeout: Option<u64>,

    /// Capacity of the queue in front of the result sink
    #[arg(long, default_value = "1024", env = "MMS_SINK_QUEUE")]
    pub sink_queue: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MMS_WORKFLOW_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the run outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the workflow descriptor to validate
    #[arg(short, long, default_value = "workflow.toml", env = "MMS_WORKFLOW_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `plan` command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Path to the workflow descriptor
    #[arg(short, long, default_value = "workflow.toml", env = "MMS_WORKFLOW_CONFIG")]
    pub config: PathBuf,

    /// Override the descriptor's run mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Ingestion,
    Matchup,
}

impl From<ModeArg> for contracts::RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ingestion => Self::Ingestion,
            ModeArg::Matchup => Self::Matchup,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
