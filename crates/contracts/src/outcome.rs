//! RunOutcome - run-level result surface

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{JobId, JobKind, TimeWindow};

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All jobs succeeded
    Completed,
    /// Queue drained but at least one job is terminal-failed
    CompletedWithFailures,
    /// Cancelled before the queue drained
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CompletedWithFailures => write!(f, "completed-with-failures"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Terminal-failed job, reported for operator re-submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    pub job_id: JobId,
    pub kind: JobKind,
    pub window: TimeWindow,
    pub sensors: Vec<String>,
    pub attempts: u32,
    pub error: String,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_name: String,

    pub status: RunStatus,

    /// Jobs created for the run
    pub jobs_total: usize,

    /// Jobs that finished successfully
    pub succeeded: usize,

    /// Terminal-failed jobs
    pub failed: Vec<FailedJob>,

    /// Windows never dispatched because the run was cancelled
    pub skipped: Vec<TimeWindow>,

    /// Records handed to the result sink queue
    pub records_emitted: u64,

    /// Records the sink confirmed as appended
    #[serde(default)]
    pub records_written: u64,

    /// Records the sink failed to append
    #[serde(default)]
    pub sink_failures: u64,

    /// Wall-clock run time
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl RunOutcome {
    /// Outcome of a run that had nothing to do
    pub fn empty(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            status: RunStatus::Completed,
            jobs_total: 0,
            succeeded: 0,
            failed: Vec::new(),
            skipped: Vec::new(),
            records_emitted: 0,
            records_written: 0,
            sink_failures: 0,
            duration: Duration::ZERO,
        }
    }

    /// Fold the sink's final counters into the outcome
    ///
    /// A run whose sink lost records is never reported as `Completed`.
    pub fn apply_sink_report(&mut self, written: u64, failures: u64) {
        self.records_written = written;
        self.sink_failures = failures;
        if failures > 0 && self.status == RunStatus::Completed {
            self.status = RunStatus::CompletedWithFailures;
        }
    }

    /// Windows of terminal-failed jobs
    pub fn failed_windows(&self) -> Vec<TimeWindow> {
        self.failed.iter().map(|job| job.window).collect()
    }
}

/// How a single job attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    Succeeded,
    /// Failed, job requeued
    Retrying,
    /// Failed, job terminal
    Failed,
}

impl fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Retrying => write!(f, "retrying"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-attempt report emitted by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub kind: JobKind,
    pub window: TimeWindow,
    pub host: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub result: AttemptResult,
    /// Records forwarded to the sink by this attempt
    pub records: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub error: Option<String>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
