//! # Workflow
//!
//! Run construction and launch: sensor registration, usecase loading,
//! time partitioning, and the in-process executor that drives the
//! ingestion and matchup engines.
//!
//! ```ignore
//! let workflow = Workflow::builder("usecase02_avhrr_m02_n18", 1, "/etc/mms")
//!     .primary_sensor("avhrr-m02", "2006-10-30", "2015-12-31", "v01.2")
//!     .secondary_sensor("avhrr-n18", "2005-06-05", "2015-12-31", "v01.2")
//!     .usecase("mmd02")
//!     .build()?;
//!
//! let outcome = workflow
//!     .run_matchup(hosts, Arc::new(LocalExecutor::new(reader)), sink, cancel)
//!     .await?;
//! ```

pub mod executor;
pub mod partition;
pub mod registry;
pub mod workflow;

pub use executor::LocalExecutor;
pub use partition::partition;
pub use registry::SensorRegistry;
pub use workflow::{Workflow, WorkflowBuilder};
