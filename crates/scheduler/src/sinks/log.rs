//! LogSink - logs record summaries via tracing

use contracts::{ContractError, OutputRecord, ResultSink};
use tracing::{debug, info, instrument};

/// Sink that logs records for debugging and dry runs
pub struct LogSink {
    name: String,
    observations: u64,
    matchups: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observations: 0,
            matchups: 0,
        }
    }

    fn log_record_summary(&self, record: &OutputRecord) {
        match record {
            OutputRecord::Observation(obs) => debug!(
                sink = %self.name,
                sensor = %obs.sensor_id,
                timestamp = %obs.timestamp,
                lat = obs.latitude,
                lon = obs.longitude,
                "Observation received"
            ),
            OutputRecord::Matchup(m) => debug!(
                sink = %self.name,
                primary = %m.primary_obs_ref.payload_ref,
                secondary = %m.secondary_obs_ref.payload_ref,
                dt_ms = m.time_delta_ms,
                distance_km = m.spatial_distance_km,
                "Matchup received"
            ),
        }
    }
}

impl ResultSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&mut self, record: &OutputRecord) -> Result<(), ContractError> {
        self.log_record_summary(record);
        match record {
            OutputRecord::Observation(_) => self.observations += 1,
            OutputRecord::Matchup(_) => self.matchups += 1,
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            observations = self.observations,
            matchups = self.matchups,
            "LogSink closed"
        );
        Ok(())
    }
}
