//! WorkflowDescriptor - Config Loader output
//!
//! Declarative launch description: run identity, sensors, usecase, time
//! slicing and the host pool.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{ContractError, HostAllocation, SensorRole, SensorSpec, TimeWindow};

/// Descriptor version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DescriptorVersion {
    #[default]
    V1,
}

/// Kind of run to launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Ingestion,
    Matchup,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingestion => write!(f, "ingestion"),
            Self::Matchup => write!(f, "matchup"),
        }
    }
}

/// Time-slice length
///
/// Written as `<n>M` (calendar months), `<n>d` (days) or `<n>h` (hours).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    Months(u32),
    Days(u32),
    Hours(u32),
}

impl Default for Granularity {
    fn default() -> Self {
        Self::Months(1)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Months(n) => write!(f, "{n}M"),
            Self::Days(n) => write!(f, "{n}d"),
            Self::Hours(n) => write!(f, "{n}h"),
        }
    }
}

impl FromStr for Granularity {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || {
            ContractError::config_validation(
                "granularity",
                format!("invalid granularity '{s}', expected e.g. 1M, 10d or 6h"),
            )
        };
        let unit = s.chars().last().ok_or_else(invalid)?;
        let count = &s[..s.len() - unit.len_utf8()];
        let count: u32 = count.parse().map_err(|_| invalid())?;
        if count == 0 {
            return Err(ContractError::config_validation(
                "granularity",
                "granularity must be at least 1",
            ));
        }
        match unit {
            'M' => Ok(Self::Months(count)),
            'd' | 'D' => Ok(Self::Days(count)),
            'h' | 'H' => Ok(Self::Hours(count)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Granularity> for String {
    fn from(value: Granularity) -> Self {
        value.to_string()
    }
}

/// Sensor entry of a descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub role: SensorRole,
    /// First valid day, quoted `"YYYY-MM-DD"`
    pub start: NaiveDate,
    /// Last valid day (inclusive)
    pub end: NaiveDate,
    pub version: String,
}

impl SensorEntry {
    pub fn to_spec(&self) -> Result<SensorSpec, ContractError> {
        SensorSpec::new(
            self.id.as_str(),
            self.role,
            self.start,
            self.end,
            self.version.clone(),
        )
    }
}

/// Inclusive date range used to narrow a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Half-open UTC window covering both end days
    pub fn to_window(&self) -> TimeWindow {
        let end = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        TimeWindow::new(
            self.start.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        )
    }
}

/// Complete launch descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    #[serde(default)]
    pub version: DescriptorVersion,

    /// Run name (e.g. "usecase02_avhrr_m02_n18")
    pub name: String,

    /// Retries allowed per job after the first attempt
    pub retry_limit: u32,

    /// Root directory for usecase and system configuration
    pub config_root: PathBuf,

    pub mode: RunMode,

    /// Usecase rules reference, required for matchup runs
    #[serde(default)]
    pub usecase: Option<String>,

    #[serde(default)]
    pub granularity: Granularity,

    /// Optional narrowing of the sensors' common interval
    #[serde(default)]
    pub interval: Option<DateRange>,

    /// Per-job timeout in seconds
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    pub sensors: Vec<SensorEntry>,

    pub hosts: Vec<HostAllocation>,
}

fn default_job_timeout_secs() -> u64 {
    600
}

impl WorkflowDescriptor {
    /// Sensor entry with the given role
    pub fn sensor(&self, role: SensorRole) -> Option<&SensorEntry> {
        self.sensors.iter().find(|s| s.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_parse() {
        assert_eq!("1M".parse::<Granularity>().unwrap(), Granularity::Months(1));
        assert_eq!("10d".parse::<Granularity>().unwrap(), Granularity::Days(10));
        assert_eq!("6h".parse::<Granularity>().unwrap(), Granularity::Hours(6));
        assert!("0d".parse::<Granularity>().is_err());
        assert!("M".parse::<Granularity>().is_err());
        assert!("3w".parse::<Granularity>().is_err());
        assert!("".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_granularity_multibyte_unit_rejected() {
        for input in ["1é", "é", "12日"] {
            let err = input.parse::<Granularity>().unwrap_err();
            assert!(
                matches!(err, ContractError::ConfigValidation { .. }),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_granularity_serde_as_string() {
        let json = serde_json::to_string(&Granularity::Days(7)).unwrap();
        assert_eq!(json, "\"7d\"");
        let parsed: Granularity = serde_json::from_str("\"2M\"").unwrap();
        assert_eq!(parsed, Granularity::Months(2));
    }

    #[test]
    fn test_date_range_window() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2010, 1, 31).unwrap(),
        };
        assert_eq!(range.to_window().duration(), chrono::Duration::days(31));
    }
}
