//! Job - per-window unit of scheduled work

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{OutputRecord, SensorSpec, TimeWindow, UsecaseRules};

/// Run-local job identifier
pub type JobId = u64;

/// What a job computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Single-sensor ingestion
    Ingest,
    /// Two-sensor collocation
    Matchup,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest => write!(f, "ingest"),
            Self::Matchup => write!(f, "matchup"),
        }
    }
}

/// Lifecycle state
///
/// `Failed` is terminal: jobs that fail with retries left go back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Scheduled unit of work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,

    pub kind: JobKind,

    pub window: TimeWindow,

    /// One sensor for ingestion, primary then secondary for matchups
    pub sensors: Vec<SensorSpec>,

    /// Shared usecase rules (matchup jobs only)
    pub rules: Option<Arc<UsecaseRules>>,

    pub status: JobStatus,

    /// Number of attempts dispatched so far
    pub attempts: u32,

    /// Text of the most recent failure
    pub last_error: Option<String>,
}

impl Job {
    /// Create an ingestion job for one sensor
    pub fn ingest(id: JobId, window: TimeWindow, sensor: SensorSpec) -> Self {
        Self {
            id,
            kind: JobKind::Ingest,
            window,
            sensors: vec![sensor],
            rules: None,
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    /// Create a matchup job for a primary/secondary pair
    pub fn matchup(
        id: JobId,
        window: TimeWindow,
        primary: SensorSpec,
        secondary: SensorSpec,
        rules: Arc<UsecaseRules>,
    ) -> Self {
        Self {
            id,
            kind: JobKind::Matchup,
            window,
            sensors: vec![primary, secondary],
            rules: Some(rules),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    /// Governing (first) sensor
    pub fn primary(&self) -> Option<&SensorSpec> {
        self.sensors.first()
    }

    /// Matched sensor, present on matchup jobs
    pub fn secondary(&self) -> Option<&SensorSpec> {
        self.sensors.get(1)
    }
}

/// Records produced by one successful job execution
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    pub records: Vec<OutputRecord>,
}

impl JobOutput {
    pub fn new(records: Vec<OutputRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
