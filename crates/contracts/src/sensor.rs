//! SensorSpec - registered sensor description
//!
//! A sensor participates in a run with a role, a product version and a
//! validity interval given as inclusive calendar dates.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ContractError, SensorId, TimeWindow};

/// Date format used by launch descriptors
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Role of a sensor within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    /// Reference sensor
    Primary,
    /// Sensor matched against the primary
    Secondary,
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Validated sensor specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Sensor identifier (e.g. "avhrr-n18")
    pub id: SensorId,

    /// Role in the run
    pub role: SensorRole,

    /// First valid day (inclusive)
    pub valid_from: NaiveDate,

    /// Last valid day (inclusive)
    pub valid_to: NaiveDate,

    /// Product version (e.g. "v01.2")
    pub version: String,
}

impl SensorSpec {
    /// Create a sensor specification
    ///
    /// # Errors
    /// `ConfigValidation` if the id is empty or `valid_from > valid_to`
    pub fn new(
        id: impl Into<SensorId>,
        role: SensorRole,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
        version: impl Into<String>,
    ) -> Result<Self, ContractError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ContractError::config_validation(
                "sensor.id",
                "sensor id cannot be empty",
            ));
        }
        if valid_from > valid_to {
            return Err(ContractError::config_validation(
                format!("sensor[{id}].valid_from"),
                format!("valid_from ({valid_from}) must be <= valid_to ({valid_to})"),
            ));
        }
        Ok(Self {
            id,
            role,
            valid_from,
            valid_to,
            version: version.into(),
        })
    }

    /// Create a sensor specification from `YYYY-MM-DD` date strings
    pub fn parse(
        id: &str,
        role: SensorRole,
        valid_from: &str,
        valid_to: &str,
        version: &str,
    ) -> Result<Self, ContractError> {
        let from = parse_date(&format!("sensor[{id}].valid_from"), valid_from)?;
        let to = parse_date(&format!("sensor[{id}].valid_to"), valid_to)?;
        Self::new(id, role, from, to, version)
    }

    /// Validity as a half-open UTC interval covering both end days
    pub fn interval(&self) -> TimeWindow {
        let start = self.valid_from.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .valid_to
            .checked_add_days(Days::new(1))
            .unwrap_or(self.valid_to)
            .and_time(NaiveTime::MIN)
            .and_utc();
        TimeWindow::new(start, end)
    }
}

/// Parse a `YYYY-MM-DD` date, reporting the offending field
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ContractError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ContractError::config_validation(field, format!("invalid date '{value}': {e}"))
    })
}
