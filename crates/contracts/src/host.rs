//! HostAllocation - worker budget of one execution host

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Host name plus its concurrency ceiling
///
/// The ceiling is enforced by the scheduler, not by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HostAllocation {
    /// Host name (e.g. "localhost")
    #[serde(alias = "name")]
    #[validate(length(min = 1, message = "host name cannot be empty"))]
    pub host: String,

    /// Maximum concurrent worker slots
    #[serde(alias = "workers")]
    #[validate(range(min = 1, message = "max_workers must be >= 1"))]
    pub max_workers: usize,
}

impl HostAllocation {
    pub fn new(host: impl Into<String>, max_workers: usize) -> Self {
        Self {
            host: host.into(),
            max_workers,
        }
    }
}

impl<S: Into<String>> From<(S, usize)> for HostAllocation {
    fn from((host, max_workers): (S, usize)) -> Self {
        Self::new(host, max_workers)
    }
}
