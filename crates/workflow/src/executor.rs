//! LocalExecutor - runs jobs in-process for any host name

use std::sync::Arc;

use contracts::{
    ContractError, Job, JobExecutor, JobKind, JobOutput, ObservationReader, ObservationRecord,
    SensorSpec, TimeWindow,
};
use ingestion::IngestionEngine;
use matchup::MatchupEngine;
use tracing::instrument;

/// Reader shared by both engines
struct SharedReader<R>(Arc<R>);

impl<R: ObservationReader + Sync> ObservationReader for SharedReader<R> {
    async fn read(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Vec<ObservationRecord>, ContractError> {
        self.0.read(sensor, window).await
    }
}

/// Host-execution channel that runs the engines on the local runtime
///
/// The host name only labels spans: every host maps to this process.
pub struct LocalExecutor<R> {
    ingestion: IngestionEngine<SharedReader<R>>,
    matchup: MatchupEngine<SharedReader<R>>,
}

impl<R: ObservationReader + Sync> LocalExecutor<R> {
    pub fn new(reader: R) -> Self {
        Self::from_shared(Arc::new(reader))
    }

    pub fn from_shared(reader: Arc<R>) -> Self {
        Self {
            ingestion: IngestionEngine::new(SharedReader(Arc::clone(&reader))),
            matchup: MatchupEngine::new(SharedReader(reader)),
        }
    }

    /// Ingestion counters accumulated over all jobs
    pub fn ingestion_metrics(&self) -> ingestion::MetricsSnapshot {
        self.ingestion.metrics().snapshot()
    }
}

impl<R: ObservationReader + Sync> JobExecutor for LocalExecutor<R> {
    #[instrument(
        name = "local_execute",
        skip(self, job),
        fields(job_id = job.id, kind = %job.kind, window = %job.window)
    )]
    async fn execute(&self, host: &str, job: &Job) -> Result<JobOutput, ContractError> {
        match job.kind {
            JobKind::Ingest => self.ingestion.run(job).await,
            JobKind::Matchup => self.matchup.run(job).await,
        }
    }
}
