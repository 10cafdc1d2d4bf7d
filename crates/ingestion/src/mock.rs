//! Mock observation reader
//!
//! Used for tests and dry runs without an archive.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use contracts::{
    ContractError, ObservationReader, ObservationRecord, SensorId, SensorSpec, SourceDataKind,
    TimeWindow,
};
use tracing::{debug, trace};

use crate::normalize::wrap_longitude;

/// Synthetic ground track
///
/// Samples are taken every `sample_interval` on the absolute time grid, so two
/// sensors sharing a track see each other at the same instants.
#[derive(Debug, Clone)]
pub struct GroundTrack {
    /// Time between two samples
    pub sample_interval: Duration,

    /// Time for one full latitude oscillation
    pub orbit_period: Duration,

    /// Peak latitude (degrees)
    pub max_latitude: f64,

    /// Longitude at the Unix epoch (degrees)
    pub lon_at_epoch: f64,

    /// Eastward drift (degrees per second)
    pub lon_drift_deg_per_sec: f64,

    /// Time shift applied to the whole track
    pub time_offset: Duration,
}

impl Default for GroundTrack {
    fn default() -> Self {
        Self {
            sample_interval: Duration::seconds(60),
            orbit_period: Duration::minutes(102),
            max_latitude: 81.0,
            lon_at_epoch: 0.0,
            lon_drift_deg_per_sec: -0.0042,
            time_offset: Duration::zero(),
        }
    }
}

impl GroundTrack {
    /// Position of the track at `instant`
    pub fn position(&self, instant: DateTime<Utc>) -> (f64, f64) {
        let secs = (instant + self.time_offset).timestamp() as f64;
        let period = self.orbit_period.num_seconds().max(1) as f64;
        let latitude = self.max_latitude * (TAU * secs / period).sin();
        let longitude = wrap_longitude(self.lon_at_epoch + self.lon_drift_deg_per_sec * secs);
        (latitude, longitude)
    }

    /// Samples of `sensor` on the grid within `window`
    pub fn sample(&self, sensor: &SensorId, window: &TimeWindow) -> Vec<ObservationRecord> {
        let step = self.sample_interval.num_seconds().max(1);
        let start = window.start.timestamp();
        let first = start.div_euclid(step) * step + if start.rem_euclid(step) == 0 { 0 } else { step };

        let mut records = Vec::new();
        let mut secs = first;
        while let Some(instant) = DateTime::from_timestamp(secs, 0) {
            if instant >= window.end {
                break;
            }
            let (latitude, longitude) = self.position(instant);
            records.push(
                ObservationRecord::new(
                    sensor.clone(),
                    instant,
                    latitude,
                    longitude,
                    format!("{sensor}:{secs}"),
                )
                .with_value("brightness_temp", 250.0 + latitude.abs() / 3.0),
            );
            secs += step;
        }
        records
    }
}

/// In-memory observation reader
///
/// Fixed records are selected at day granularity: anything within one day of
/// the requested window is returned, as a file-per-day archive would.
#[derive(Debug, Default)]
pub struct MockObservationReader {
    records: HashMap<SensorId, Vec<ObservationRecord>>,
    tracks: HashMap<SensorId, GroundTrack>,
    failures: Mutex<HashMap<(SensorId, DateTime<Utc>), (SourceDataKind, u32)>>,
}

impl MockObservationReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fixed records for a sensor
    pub fn with_records(
        mut self,
        sensor: impl Into<SensorId>,
        records: Vec<ObservationRecord>,
    ) -> Self {
        self.records.entry(sensor.into()).or_default().extend(records);
        self
    }

    /// Generate observations for a sensor along a synthetic track
    pub fn with_track(mut self, sensor: impl Into<SensorId>, track: GroundTrack) -> Self {
        self.tracks.insert(sensor.into(), track);
        self
    }

    /// Fail the next `times` reads of `sensor` for the window starting at `start`
    pub fn fail_window(
        self,
        sensor: impl Into<SensorId>,
        start: DateTime<Utc>,
        kind: SourceDataKind,
        times: u32,
    ) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((sensor.into(), start), (kind, times));
        }
        self
    }

    fn injected_failure(&self, sensor: &SensorSpec, window: &TimeWindow) -> Option<SourceDataKind> {
        let mut failures = self.failures.lock().ok()?;
        let key = (sensor.id.clone(), window.start);
        let (kind, remaining) = failures.get_mut(&key)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(*kind)
    }
}

impl ObservationReader for MockObservationReader {
    async fn read(
        &self,
        sensor: &SensorSpec,
        window: &TimeWindow,
    ) -> Result<Vec<ObservationRecord>, ContractError> {
        match self.injected_failure(sensor, window) {
            Some(SourceDataKind::Missing) => {
                return Err(ContractError::source_missing(
                    sensor.id.as_str(),
                    *window,
                    "injected missing input",
                ));
            }
            Some(SourceDataKind::Corrupt) => {
                return Err(ContractError::source_corrupt(
                    sensor.id.as_str(),
                    *window,
                    "injected corrupt input",
                ));
            }
            None => {}
        }

        let coarse = window.widen(Duration::days(1));
        let mut found: Vec<ObservationRecord> = self
            .records
            .get(&sensor.id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| coarse.contains(r.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(track) = self.tracks.get(&sensor.id) {
            found.extend(track.sample(&sensor.id, window));
        }

        if found.is_empty() {
            debug!(sensor = %sensor.id, window = %window, "mock reader has no data");
            return Err(ContractError::source_missing(
                sensor.id.as_str(),
                *window,
                "no observations registered",
            ));
        }

        trace!(sensor = %sensor.id, count = found.len(), "mock observations read");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::SensorRole;

    fn sensor(id: &str) -> SensorSpec {
        SensorSpec::parse(id, SensorRole::Primary, "2010-01-01", "2010-12-31", "v1").unwrap()
    }

    fn hour_window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2010, 5, 1, 0, 0, 30).unwrap();
        TimeWindow::new(start, start + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_track_samples_on_grid() {
        let reader = MockObservationReader::new().with_track("avhrr-n18", GroundTrack::default());
        let records = reader.read(&sensor("avhrr-n18"), &hour_window()).await.unwrap();

        assert_eq!(records.len(), 60);
        assert_eq!(records[0].timestamp.timestamp() % 60, 0);
        assert!(records[0].timestamp >= hour_window().start);
        for r in &records {
            assert!((-81.0..=81.0).contains(&r.latitude));
            assert!((-180.0..180.0).contains(&r.longitude));
        }
    }

    #[tokio::test]
    async fn test_unknown_sensor_is_missing() {
        let reader = MockObservationReader::new();
        let err = reader.read(&sensor("hirs-n15"), &hour_window()).await.unwrap_err();
        assert!(err.is_missing_source());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let window = hour_window();
        let reader = MockObservationReader::new()
            .with_track("avhrr-n18", GroundTrack::default())
            .fail_window("avhrr-n18", window.start, SourceDataKind::Corrupt, 1);

        let first = reader.read(&sensor("avhrr-n18"), &window).await;
        assert!(first.unwrap_err().is_retryable());
        assert!(reader.read(&sensor("avhrr-n18"), &window).await.is_ok());
    }
}
