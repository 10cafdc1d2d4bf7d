//! SensorRegistry - sensors taking part in a run

use contracts::{ContractError, SensorRole, SensorSpec, TimeWindow};

/// At most one primary and one secondary sensor
///
/// The common validity interval is checked as soon as both roles are
/// registered, so a pair without overlap is rejected at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorRegistry {
    primary: Option<SensorSpec>,
    secondary: Option<SensorSpec>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the primary sensor
    ///
    /// # Errors
    /// - `ConfigValidation` if `spec.role` is not primary
    /// - `DuplicateRole` if a primary is already registered
    /// - `EmptyInterval` if it does not overlap the registered secondary
    pub fn add_primary(&mut self, spec: SensorSpec) -> Result<(), ContractError> {
        self.register(SensorRole::Primary, spec)
    }

    /// Register the secondary sensor, same rules as [`Self::add_primary`]
    pub fn add_secondary(&mut self, spec: SensorSpec) -> Result<(), ContractError> {
        self.register(SensorRole::Secondary, spec)
    }

    /// Register a sensor under its own role
    pub fn add(&mut self, spec: SensorSpec) -> Result<(), ContractError> {
        self.register(spec.role, spec)
    }

    fn register(&mut self, role: SensorRole, spec: SensorSpec) -> Result<(), ContractError> {
        if spec.role != role {
            return Err(ContractError::config_validation(
                "sensor.role",
                format!(
                    "sensor '{}' has role {} but was registered as {role}",
                    spec.id, spec.role
                ),
            ));
        }

        let (slot, other) = match role {
            SensorRole::Primary => (&mut self.primary, self.secondary.as_ref()),
            SensorRole::Secondary => (&mut self.secondary, self.primary.as_ref()),
        };
        if let Some(existing) = slot {
            return Err(ContractError::DuplicateRole {
                role: role.to_string(),
                existing: existing.id.to_string(),
                rejected: spec.id.to_string(),
            });
        }
        if let Some(other) = other {
            if spec.interval().intersect(&other.interval()).is_none() {
                return Err(ContractError::EmptyInterval {
                    sensors: vec![other.id.to_string(), spec.id.to_string()],
                });
            }
        }

        *slot = Some(spec);
        Ok(())
    }

    pub fn primary(&self) -> Option<&SensorSpec> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&SensorSpec> {
        self.secondary.as_ref()
    }

    /// Registered sensors, primary first
    pub fn sensors(&self) -> impl Iterator<Item = &SensorSpec> {
        self.primary.iter().chain(self.secondary.iter())
    }

    pub fn is_pair(&self) -> bool {
        self.primary.is_some() && self.secondary.is_some()
    }

    /// Intersection of all registered validity intervals
    ///
    /// # Errors
    /// `ConfigValidation` without a primary, `EmptyInterval` when the
    /// intervals do not overlap.
    pub fn effective_interval(&self) -> Result<TimeWindow, ContractError> {
        let primary = self.primary.as_ref().ok_or_else(|| {
            ContractError::config_validation("sensors", "a primary sensor is required")
        })?;

        let mut interval = primary.interval();
        if let Some(secondary) = &self.secondary {
            interval = interval
                .intersect(&secondary.interval())
                .ok_or_else(|| ContractError::EmptyInterval {
                    sensors: self.sensors().map(|s| s.id.to_string()).collect(),
                })?;
        }
        Ok(interval)
    }
}
