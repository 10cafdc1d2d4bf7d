//! Result records - Ingestion / Matchup output
//!
//! Records are immutable once emitted and ownership moves to the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SensorId;

/// Canonical single-sensor observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Sensor that acquired the observation
    pub sensor_id: SensorId,

    /// Acquisition time
    pub timestamp: DateTime<Utc>,

    /// Latitude (degrees, [-90, 90])
    pub latitude: f64,

    /// Longitude (degrees, [-180, 180))
    pub longitude: f64,

    /// Opaque reference to the source data (file + pixel, row id, ...)
    pub payload_ref: String,

    /// Named measurement values, not interpreted by the core
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, f64>,
}

impl ObservationRecord {
    pub fn new(
        sensor_id: impl Into<SensorId>,
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        payload_ref: impl Into<String>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp,
            latitude,
            longitude,
            payload_ref: payload_ref.into(),
            values: BTreeMap::new(),
        }
    }

    /// Attach a named value
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Stable identity of this observation
    pub fn obs_ref(&self) -> ObservationRef {
        ObservationRef {
            sensor_id: self.sensor_id.clone(),
            timestamp: self.timestamp,
            payload_ref: self.payload_ref.clone(),
        }
    }
}

/// Reference to one observation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationRef {
    pub sensor_id: SensorId,
    pub timestamp: DateTime<Utc>,
    pub payload_ref: String,
}

impl ObservationRef {
    fn key(&self) -> String {
        format!(
            "{}@{}#{}",
            self.sensor_id,
            self.timestamp.timestamp_millis(),
            self.payload_ref
        )
    }
}

/// Pair of collocated observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRecord {
    pub primary_obs_ref: ObservationRef,

    pub secondary_obs_ref: ObservationRef,

    /// Secondary minus primary acquisition time (milliseconds)
    pub time_delta_ms: i64,

    /// Great-circle distance (km)
    pub spatial_distance_km: f64,

    /// Projected usecase variables (`primary.<var>` / `secondary.<var>`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, f64>,
}

/// Anything a job hands to the result sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord {
    Observation(ObservationRecord),
    Matchup(MatchupRecord),
}

impl OutputRecord {
    /// Stable identity, used by sinks for idempotent appends
    pub fn record_key(&self) -> String {
        match self {
            Self::Observation(obs) => format!("obs:{}", obs.obs_ref().key()),
            Self::Matchup(m) => format!(
                "mu:{}|{}",
                m.primary_obs_ref.key(),
                m.secondary_obs_ref.key()
            ),
        }
    }

    /// Short label for logs and file names
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Observation(_) => "observation",
            Self::Matchup(_) => "matchup",
        }
    }
}

impl From<ObservationRecord> for OutputRecord {
    fn from(record: ObservationRecord) -> Self {
        Self::Observation(record)
    }
}

impl From<MatchupRecord> for OutputRecord {
    fn from(record: MatchupRecord) -> Self {
        Self::Matchup(record)
    }
}
