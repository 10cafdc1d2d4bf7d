//! MatchupEngine - per-window dual-sensor collocation

use std::sync::Arc;

use contracts::{
    ContractError, Job, JobKind, JobOutput, MatchupRecord, ObservationReader, ObservationRecord,
    OutputRecord, SensorSpec, TimeWindow, UsecaseRules,
};
use tracing::{debug, instrument};

use crate::collocate::{collocate, MatchCriteria};

/// Collocates a primary and a secondary sensor within one window
///
/// Primaries are read for the window itself; secondaries for the window
/// widened by the usecase time delta so edge primaries still see their
/// neighbours.
pub struct MatchupEngine<R> {
    reader: R,
}

impl<R: ObservationReader> MatchupEngine<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Matchup records for one window
    ///
    /// Missing input on either side yields an empty result.
    #[instrument(
        name = "matchup_window",
        skip(self, primary, secondary, rules),
        fields(primary = %primary.id, secondary = %secondary.id, window = %window)
    )]
    pub async fn matchup(
        &self,
        primary: &SensorSpec,
        secondary: &SensorSpec,
        window: &TimeWindow,
        rules: Arc<UsecaseRules>,
    ) -> Result<Vec<MatchupRecord>, ContractError> {
        let Some(mut primaries) = self.read_side(primary, window).await? else {
            return Ok(Vec::new());
        };
        primaries.retain(|r| window.contains(r.timestamp));
        if primaries.is_empty() {
            return Ok(Vec::new());
        }

        let widened = window.widen(rules.max_time_delta());
        let Some(mut secondaries) = self.read_side(secondary, &widened).await? else {
            return Ok(Vec::new());
        };
        secondaries.retain(|r| widened.contains(r.timestamp));

        let (n_primary, n_secondary) = (primaries.len(), secondaries.len());
        let criteria = MatchCriteria::from_rules(&rules);
        let matchups = tokio::task::spawn_blocking(move || {
            collocate(&primaries, &secondaries, &criteria)
        })
        .await
        .map_err(|e| ContractError::matchup(format!("collocation task failed: {e}")))??;

        metrics::counter!("mms_records_matched_total").increment(matchups.len() as u64);
        debug!(
            primaries = n_primary,
            secondaries = n_secondary,
            matchups = matchups.len(),
            "window collocated"
        );
        Ok(matchups)
    }

    /// Execute a matchup job
    pub async fn run(&self, job: &Job) -> Result<JobOutput, ContractError> {
        if job.kind != JobKind::Matchup {
            return Err(ContractError::config_validation(
                "job.kind",
                format!("matchup engine cannot run {} job {}", job.kind, job.id),
            ));
        }
        let (Some(primary), Some(secondary), Some(rules)) =
            (job.primary(), job.secondary(), job.rules.clone())
        else {
            return Err(ContractError::config_validation(
                "job",
                format!("matchup job {} needs two sensors and usecase rules", job.id),
            ));
        };

        let matchups = self.matchup(primary, secondary, &job.window, rules).await?;
        Ok(JobOutput::new(
            matchups.into_iter().map(OutputRecord::from).collect(),
        ))
    }

    async fn read_side(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Option<Vec<ObservationRecord>>, ContractError> {
        match self.reader.read(sensor, window).await {
            Ok(records) => Ok(Some(records)),
            Err(e) if e.is_missing_source() => {
                debug!(sensor = %sensor.id, error = %e, "no input, window yields no matchups");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
