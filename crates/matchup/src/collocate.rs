//! Spatio-temporal collocation
//!
//! Pure, synchronous core of the matchup engine. For every primary
//! observation the closest qualifying secondary is selected, scored as
//! `|dt| / dt_max + d / d_max`.

use std::collections::BTreeMap;

use chrono::Duration;
use contracts::{ContractError, MatchupRecord, ObservationRecord, UsecaseRules};

use crate::geo::{haversine_km, is_valid_position};

/// Matching thresholds and projected variables
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCriteria {
    /// Maximum absolute time difference (inclusive)
    pub max_time_delta: Duration,
    /// Maximum great-circle distance in km (inclusive)
    pub max_distance_km: f64,
    /// Variables copied into each matchup record
    pub variables: Vec<String>,
}

impl MatchCriteria {
    pub fn from_rules(rules: &UsecaseRules) -> Self {
        Self {
            max_time_delta: rules.max_time_delta(),
            max_distance_km: rules.max_distance_km(),
            variables: rules.variables.clone(),
        }
    }

    fn check(&self) -> Result<(), ContractError> {
        if self.max_time_delta <= Duration::zero() {
            return Err(ContractError::matchup("max time delta must be positive"));
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            return Err(ContractError::matchup(format!(
                "max distance must be positive, got {}",
                self.max_distance_km
            )));
        }
        Ok(())
    }
}

struct Candidate {
    index: usize,
    score: f64,
    distance_km: f64,
}

/// Pair each primary with its best secondary
///
/// Output is ordered by primary timestamp, then primary input order. Exact
/// score ties go to the earlier secondary timestamp, then secondary input
/// order. Unmatched primaries produce nothing.
///
/// # Errors
/// `MatchupComputation` when any observation has an invalid position.
pub fn collocate(
    primaries: &[ObservationRecord],
    secondaries: &[ObservationRecord],
    criteria: &MatchCriteria,
) -> Result<Vec<MatchupRecord>, ContractError> {
    criteria.check()?;
    check_positions("primary", primaries)?;
    check_positions("secondary", secondaries)?;

    let primary_order = sorted_order(primaries);
    let secondary_order = sorted_order(secondaries);
    let sorted: Vec<&ObservationRecord> = secondary_order.iter().map(|&i| &secondaries[i]).collect();

    let max_dt_ms = criteria.max_time_delta.num_milliseconds() as f64;
    let mut matchups = Vec::new();

    for &p in &primary_order {
        let primary = &primaries[p];
        let earliest = primary.timestamp - criteria.max_time_delta;
        let latest = primary.timestamp + criteria.max_time_delta;
        let first = sorted.partition_point(|s| s.timestamp < earliest);

        let mut best: Option<Candidate> = None;
        for (index, secondary) in sorted.iter().enumerate().skip(first) {
            if secondary.timestamp > latest {
                break;
            }
            let distance_km = haversine_km(
                primary.latitude,
                primary.longitude,
                secondary.latitude,
                secondary.longitude,
            );
            if distance_km > criteria.max_distance_km {
                continue;
            }
            let dt_ms = (secondary.timestamp - primary.timestamp)
                .num_milliseconds()
                .abs() as f64;
            let score = dt_ms / max_dt_ms + distance_km / criteria.max_distance_km;
            // strict comparison keeps the earliest candidate on exact ties
            if best.as_ref().is_none_or(|b| score < b.score) {
                best = Some(Candidate {
                    index,
                    score,
                    distance_km,
                });
            }
        }

        if let Some(best) = best {
            matchups.push(build_record(
                primary,
                sorted[best.index],
                best.distance_km,
                &criteria.variables,
            ));
        }
    }

    Ok(matchups)
}

/// Indices sorted by (timestamp, input index)
fn sorted_order(records: &[ObservationRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| (records[i].timestamp, i));
    order
}

fn check_positions(side: &str, records: &[ObservationRecord]) -> Result<(), ContractError> {
    match records
        .iter()
        .find(|r| !is_valid_position(r.latitude, r.longitude))
    {
        Some(r) => Err(ContractError::matchup(format!(
            "{side} observation '{}' of '{}' has invalid position ({}, {})",
            r.payload_ref, r.sensor_id, r.latitude, r.longitude
        ))),
        None => Ok(()),
    }
}

fn build_record(
    primary: &ObservationRecord,
    secondary: &ObservationRecord,
    distance_km: f64,
    variables: &[String],
) -> MatchupRecord {
    let mut values = BTreeMap::new();
    for name in variables {
        if let Some(v) = primary.values.get(name) {
            values.insert(format!("primary.{name}"), *v);
        }
        if let Some(v) = secondary.values.get(name) {
            values.insert(format!("secondary.{name}"), *v);
        }
    }

    MatchupRecord {
        primary_obs_ref: primary.obs_ref(),
        secondary_obs_ref: secondary.obs_ref(),
        time_delta_ms: (secondary.timestamp - primary.timestamp).num_milliseconds(),
        spatial_distance_km: distance_km,
        values,
    }
}
