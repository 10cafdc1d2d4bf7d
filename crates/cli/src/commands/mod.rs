//! Command implementations.

mod plan;
mod run;
mod validate;

pub use plan::run_plan;
pub use run::run_workflow;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::WorkflowDescriptor;

use crate::error::CliError;

/// Load a descriptor, failing early on a missing file
fn load_descriptor(path: &Path) -> Result<WorkflowDescriptor> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::DescriptorLoader::load_from_path(path)
        .with_context(|| format!("Failed to load descriptor from {}", path.display()))
}
