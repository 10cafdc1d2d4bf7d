//! # Scheduler
//!
//! Job dispatch over a pool of execution hosts.
//!
//! Responsibilities:
//! - Keep each host under its worker ceiling
//! - Retry failed jobs within the run's retry limit and enforce timeouts
//! - Stop dispatching on cancellation and report what was skipped
//! - Own the result sink in an isolated worker task

pub mod error;
pub mod handle;
pub mod metrics;
pub mod pool;
pub mod scheduler;
pub mod sinks;
mod state;

pub use contracts::{ResultSink, RunOutcome};
pub use error::SchedulerError;
pub use handle::{RecordSender, SinkHandle, DEFAULT_SINK_QUEUE};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use pool::HostPool;
pub use scheduler::{JobObserver, JobScheduler, SchedulerConfig, DEFAULT_JOB_TIMEOUT};
pub use sinks::{FileSink, FileSinkConfig, LogSink, MemoryRecords, MemorySink};
pub use tokio_util::sync::CancellationToken;
