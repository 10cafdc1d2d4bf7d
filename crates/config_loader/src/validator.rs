//! Configuration validation
//!
//! Descriptor rules:
//! - run name not empty
//! - exactly one primary sensor, at most one secondary
//! - sensor dates ordered, sensor ids unique
//! - matchup runs name a secondary sensor and a usecase
//! - at least one host, host names unique, workers >= 1
//! - interval override ordered, job timeout >= 1s
//!
//! Usecase rules are checked by their derive validation.

use std::collections::HashSet;

use contracts::{ContractError, RunMode, SensorRole, UsecaseRules, WorkflowDescriptor};
use validator::Validate;

/// Validate a workflow descriptor
///
/// Returns the first error encountered, or Ok(()).
pub fn validate_descriptor(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    validate_name(descriptor)?;
    validate_sensors(descriptor)?;
    validate_mode(descriptor)?;
    validate_hosts(descriptor)?;
    validate_timing(descriptor)?;
    Ok(())
}

/// Validate usecase rules
pub fn validate_rules(rules: &UsecaseRules) -> Result<(), ContractError> {
    rules.check()
}

fn validate_name(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    if descriptor.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "name",
            "run name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_sensors(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sensor in &descriptor.sensors {
        if !seen.insert(sensor.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sensors[id={}]", sensor.id),
                "duplicate sensor id",
            ));
        }
        sensor.to_spec()?;
    }

    for role in [SensorRole::Primary, SensorRole::Secondary] {
        let mut entries = descriptor.sensors.iter().filter(|s| s.role == role);
        if let (Some(existing), Some(rejected)) = (entries.next(), entries.next()) {
            return Err(ContractError::DuplicateRole {
                role: role.to_string(),
                existing: existing.id.clone(),
                rejected: rejected.id.clone(),
            });
        }
    }

    if descriptor.sensor(SensorRole::Primary).is_none() {
        return Err(ContractError::config_validation(
            "sensors",
            "a primary sensor is required",
        ));
    }
    Ok(())
}

fn validate_mode(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    if descriptor.mode != RunMode::Matchup {
        return Ok(());
    }
    if descriptor.sensor(SensorRole::Secondary).is_none() {
        return Err(ContractError::config_validation(
            "sensors",
            "matchup runs require a secondary sensor",
        ));
    }
    match descriptor.usecase.as_deref() {
        Some(usecase) if !usecase.trim().is_empty() => Ok(()),
        _ => Err(ContractError::config_validation(
            "usecase",
            "matchup runs require a usecase reference",
        )),
    }
}

fn validate_hosts(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    if descriptor.hosts.is_empty() {
        return Err(ContractError::config_validation(
            "hosts",
            "at least one host is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, host) in descriptor.hosts.iter().enumerate() {
        host.validate().map_err(|e| {
            ContractError::config_validation(format!("hosts[{idx}]"), e.to_string())
        })?;
        if !seen.insert(host.host.as_str()) {
            return Err(ContractError::config_validation(
                format!("hosts[name={}]", host.host),
                "duplicate host name",
            ));
        }
    }
    Ok(())
}

fn validate_timing(descriptor: &WorkflowDescriptor) -> Result<(), ContractError> {
    if descriptor.job_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "job_timeout_secs",
            "job_timeout_secs must be >= 1",
        ));
    }
    if let Some(interval) = &descriptor.interval {
        if interval.start > interval.end {
            return Err(ContractError::config_validation(
                "interval",
                format!(
                    "interval start ({}) must be <= end ({})",
                    interval.start, interval.end
                ),
            ));
        }
    }
    Ok(())
}
