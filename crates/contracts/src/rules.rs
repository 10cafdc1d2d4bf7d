//! UsecaseRules - matching criteria of a matchup campaign
//!
//! Loaded once per run and shared read-only across all jobs.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use crate::ContractError;

/// Largest accepted matching time delta (one day)
pub const MAX_TIME_DELTA_SECONDS: u64 = 86_400;

/// Named set of matching-rule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UsecaseRules {
    /// Usecase name (e.g. "mmd02")
    #[validate(length(min = 1, message = "usecase name cannot be empty"))]
    pub name: String,

    /// Maximum absolute time difference between paired observations (seconds)
    #[validate(range(
        min = 1,
        max = 86400,
        message = "time_delta_seconds must be within 1..=86400"
    ))]
    pub time_delta_seconds: u64,

    /// Maximum great-circle distance between paired observations (km)
    #[validate(range(exclusive_min = 0.0, message = "max_distance_km must be > 0"))]
    pub max_distance_km: f64,

    /// Variables projected into matchup records
    #[serde(default)]
    #[validate(custom(function = "validate_variables"))]
    pub variables: Vec<String>,

    /// Default JSON Lines output directory, relative to the configuration root
    #[serde(default)]
    pub output_path: Option<String>,
}

impl UsecaseRules {
    /// Maximum time delta as a duration
    pub fn max_time_delta(&self) -> Duration {
        let seconds = self.time_delta_seconds.min(MAX_TIME_DELTA_SECONDS) as i64;
        Duration::try_seconds(seconds).unwrap_or_else(Duration::zero)
    }

    /// Maximum spatial distance in kilometres
    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }

    /// Run derive validation and map the first failure to `ConfigValidation`
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|errors| {
            let (field, message) = errors
                .field_errors()
                .into_iter()
                .next()
                .map(|(field, errs)| {
                    let message = errs
                        .first()
                        .and_then(|e| e.message.as_ref())
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string());
                    (format!("usecase.{field}"), message)
                })
                .unwrap_or_else(|| ("usecase".to_string(), errors.to_string()));
            ContractError::config_validation(field, message)
        })
    }
}

fn validate_variables(variables: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in variables {
        if name.trim().is_empty() {
            let mut err = ValidationError::new("empty_variable");
            err.message = Some("variable names cannot be empty".into());
            return Err(err);
        }
        if !seen.insert(name.as_str()) {
            let mut err = ValidationError::new("duplicate_variable");
            err.message = Some(format!("duplicate variable '{name}'").into());
            return Err(err);
        }
    }
    Ok(())
}
