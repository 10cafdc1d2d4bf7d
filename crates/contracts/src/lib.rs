//! # Contracts
//!
//! Frozen interface contracts shared by all workflow crates: sensor and rule
//! descriptions, time windows, jobs, result records, errors, and the
//! collaborator traits (reader, rules loader, executor, sink).
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - All instants are UTC (`chrono::DateTime<Utc>`)
//! - Windows are half-open `[start, end)`
//! - Sensor validity dates are inclusive calendar days

mod collaborator;
mod descriptor;
mod error;
mod host;
mod job;
mod outcome;
mod record;
mod rules;
mod sensor;
mod sensor_id;
mod sink;
mod window;

pub use collaborator::{
    JobExecutor, LocalJobExecutor, LocalObservationReader, ObservationReader, RulesLoader,
};
pub use descriptor::*;
pub use error::*;
pub use host::*;
pub use job::*;
pub use outcome::*;
pub use record::*;
pub use rules::*;
pub use sensor::*;
pub use sensor_id::SensorId;
pub use sink::*;
pub use window::*;
