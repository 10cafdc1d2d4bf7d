//! Error types for CLI operations.

use contracts::{ContractError, RunStatus};
use scheduler::SchedulerError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Descriptor file not found
    #[error("Workflow descriptor not found: {path}")]
    ConfigNotFound { path: String },

    /// Neither an archive nor synthetic input was selected
    #[error("No observation source: pass --archive <dir> or --synthetic")]
    NoObservationSource,

    /// The run finished without completing every job
    #[error("Run '{run_name}' finished {status}: {failed} failed, {skipped} skipped")]
    RunIncomplete {
        run_name: String,
        status: RunStatus,
        failed: usize,
        skipped: usize,
    },

    /// Workflow definition or launch error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Scheduler setup error
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
