//! HostPool - execution hosts and their worker budgets

use std::collections::HashSet;

use contracts::HostAllocation;
use validator::Validate;

use crate::error::SchedulerError;

/// Ordered set of hosts with per-host worker ceilings
///
/// Declaration order is kept: it breaks ties when hosts have equal free
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPool {
    hosts: Vec<HostAllocation>,
}

impl HostPool {
    /// Build a pool
    ///
    /// # Errors
    /// `InvalidPool` when the list is empty, a host name repeats, or a host
    /// has no worker slot.
    pub fn new(hosts: impl IntoIterator<Item = HostAllocation>) -> Result<Self, SchedulerError> {
        let hosts: Vec<HostAllocation> = hosts.into_iter().collect();
        if hosts.is_empty() {
            return Err(SchedulerError::InvalidPool(
                "at least one host is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for host in &hosts {
            host.validate().map_err(|e| {
                SchedulerError::InvalidPool(format!("host '{}': {e}", host.host))
            })?;
            if !seen.insert(host.host.as_str()) {
                return Err(SchedulerError::InvalidPool(format!(
                    "duplicate host '{}'",
                    host.host
                )));
            }
        }
        Ok(Self { hosts })
    }

    /// Single host, e.g. `localhost` with 24 workers
    pub fn single(host: impl Into<String>, max_workers: usize) -> Result<Self, SchedulerError> {
        Self::new([HostAllocation::new(host, max_workers)])
    }

    pub fn hosts(&self) -> &[HostAllocation] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Sum of all worker budgets
    pub fn total_capacity(&self) -> usize {
        self.hosts.iter().map(|h| h.max_workers).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_capacity() {
        let pool = HostPool::new([
            HostAllocation::new("node1", 4),
            HostAllocation::new("node2", 2),
        ])
        .unwrap();
        assert_eq!(pool.total_capacity(), 6);
        assert_eq!(pool.hosts()[0].host, "node1");
    }

    #[test]
    fn test_invalid_pools() {
        assert!(HostPool::new(Vec::new()).is_err());
        assert!(HostPool::single("localhost", 0).is_err());
        let duplicate = HostPool::new([
            HostAllocation::new("node1", 1),
            HostAllocation::new("node1", 1),
        ]);
        assert!(matches!(duplicate, Err(SchedulerError::InvalidPool(_))));
    }
}
