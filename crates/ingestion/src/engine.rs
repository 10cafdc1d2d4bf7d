//! IngestionEngine - per-window single-sensor transform

use std::sync::Arc;

use contracts::{
    ContractError, Job, JobKind, JobOutput, ObservationReader, ObservationRecord, OutputRecord,
    SensorSpec, TimeWindow,
};
use tracing::{debug, instrument, warn};

use crate::metrics::IngestionMetrics;
use crate::normalize::normalize;

/// Reads one sensor's observations for a window and normalizes them
pub struct IngestionEngine<R> {
    reader: R,
    metrics: Arc<IngestionMetrics>,
}

impl<R: ObservationReader> IngestionEngine<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Canonical observations of `sensor` within `window`
    ///
    /// Missing input yields an empty result. Corrupt input fails the call
    /// with a retryable error.
    #[instrument(
        name = "ingestion_ingest",
        skip(self, sensor),
        fields(sensor = %sensor.id, window = %window)
    )]
    pub async fn ingest(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Vec<ObservationRecord>, ContractError> {
        let raw = match self.reader.read(sensor, window).await {
            Ok(raw) => raw,
            Err(e) if e.is_missing_source() => {
                self.metrics.record_missing();
                metrics::counter!("mms_source_windows_total", "status" => "missing").increment(1);
                debug!(error = %e, "no input for window");
                return Ok(Vec::new());
            }
            Err(e) => {
                if matches!(e, ContractError::SourceData { .. }) {
                    self.metrics.record_corrupt();
                    metrics::counter!("mms_source_windows_total", "status" => "corrupt")
                        .increment(1);
                }
                return Err(e);
            }
        };

        let read = raw.len();
        self.metrics.record_read(read);

        let mut records = Vec::with_capacity(read);
        for observation in raw {
            match normalize(sensor, window, observation) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    self.metrics.record_corrupt();
                    metrics::counter!("mms_source_windows_total", "status" => "corrupt")
                        .increment(1);
                    warn!(error = %e, "corrupt observation");
                    return Err(e);
                }
            }
        }

        let dropped = read - records.len();
        if dropped > 0 {
            self.metrics.record_out_of_window(dropped);
        }
        self.metrics.record_emitted(records.len());
        metrics::counter!("mms_records_ingested_total", "sensor" => sensor.id.to_string())
            .increment(records.len() as u64);
        debug!(read, emitted = records.len(), dropped, "window ingested");
        Ok(records)
    }

    /// Execute an ingestion job
    pub async fn run(&self, job: &Job) -> Result<JobOutput, ContractError> {
        if job.kind != JobKind::Ingest {
            return Err(ContractError::config_validation(
                "job.kind",
                format!("ingestion engine cannot run {} job {}", job.kind, job.id),
            ));
        }
        let sensor = job.primary().ok_or_else(|| {
            ContractError::config_validation("job.sensors", format!("job {} has no sensor", job.id))
        })?;

        let records = self.ingest(sensor, &job.window).await?;
        Ok(JobOutput::new(
            records.into_iter().map(OutputRecord::from).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockObservationReader;
    use chrono::{Duration, TimeZone, Utc};
    use contracts::SensorRole;

    fn sensor() -> SensorSpec {
        SensorSpec::parse("bottle-sst", SensorRole::Primary, "1978-01-01", "2016-12-31", "v03.3")
            .unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2010, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2010, 6, 2, 0, 0, 0).unwrap(),
        )
    }

    fn obs(offset_hours: i64, lon: f64) -> ObservationRecord {
        ObservationRecord::new(
            "bottle-sst",
            window().start + Duration::hours(offset_hours),
            12.0,
            lon,
            format!("cast-{offset_hours}"),
        )
    }

    #[tokio::test]
    async fn test_ingest_normalizes_and_filters() {
        let reader = MockObservationReader::new().with_records(
            "bottle-sst",
            vec![obs(1, 10.0), obs(2, 270.0), obs(30, 0.0)],
        );
        let engine = IngestionEngine::new(reader);

        let records = engine.ingest(&sensor(), &window()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].longitude, -90.0);

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.records_emitted, 2);
    }

    #[tokio::test]
    async fn test_missing_input_is_empty_success() {
        let engine = IngestionEngine::new(MockObservationReader::new());
        let records = engine.ingest(&sensor(), &window()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(engine.metrics().snapshot().missing_windows, 1);
    }

    #[tokio::test]
    async fn test_corrupt_input_fails_retryably() {
        let mut bad = obs(3, 0.0);
        bad.latitude = -123.0;
        let reader = MockObservationReader::new().with_records("bottle-sst", vec![obs(1, 0.0), bad]);
        let engine = IngestionEngine::new(reader);

        let err = engine.ingest(&sensor(), &window()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(engine.metrics().snapshot().corrupt_windows, 1);
    }

    #[tokio::test]
    async fn test_run_job() {
        let reader = MockObservationReader::new().with_records("bottle-sst", vec![obs(5, 5.0)]);
        let engine = IngestionEngine::new(reader);
        let job = Job::ingest(1, window(), sensor());

        let output = engine.run(&job).await.unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.records[0].kind_name(), "observation");
    }
}
