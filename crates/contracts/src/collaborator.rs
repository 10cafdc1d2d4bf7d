//! Collaborator traits consumed by the core
//!
//! - `ObservationReader`: sensor observations for a window
//! - `RulesLoader`: usecase rules by reference
//! - `JobExecutor`: host-execution channel

use crate::{ContractError, Job, JobOutput, ObservationRecord, SensorSpec, TimeWindow, UsecaseRules};

/// Observation source for one sensor
///
/// Returns `SourceData { kind: Missing }` when nothing is readable for the
/// window and `SourceData { kind: Corrupt }` for malformed input.
#[trait_variant::make(ObservationReader: Send)]
pub trait LocalObservationReader {
    /// Read all observations of `sensor` acquired within `window`
    async fn read(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Vec<ObservationRecord>, ContractError>;
}

/// Resolves a usecase reference (name or path) to validated rules
pub trait RulesLoader {
    /// # Errors
    /// `ConfigParse` / `ConfigValidation` for missing or malformed rules
    fn load(&self, reference: &str) -> Result<UsecaseRules, ContractError>;
}

/// Executes a job on a named host
#[trait_variant::make(JobExecutor: Send)]
pub trait LocalJobExecutor {
    /// Run `job` on `host` and return the produced records
    async fn execute(&self, host: &str, job: &Job) -> Result<JobOutput, ContractError>;
}
