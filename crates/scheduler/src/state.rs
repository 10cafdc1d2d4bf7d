//! Run state: the job queue and per-host worker counters
//!
//! Owned exclusively by the scheduler loop task; worker tasks never touch it.

use std::collections::VecDeque;

use contracts::{AttemptResult, ContractError, FailedJob, Job, JobStatus, TimeWindow};

use crate::pool::HostPool;

#[derive(Debug)]
pub(crate) struct HostSlot {
    pub name: String,
    pub max_workers: usize,
    /// Capacity after demotions, in `1..=max_workers`
    pub effective: usize,
    pub active: usize,
}

impl HostSlot {
    fn free(&self) -> usize {
        self.effective.saturating_sub(self.active)
    }
}

#[derive(Debug)]
pub(crate) struct RunState {
    pending: VecDeque<Job>,
    hosts: Vec<HostSlot>,
    retry_limit: u32,
    succeeded: usize,
    failed: Vec<FailedJob>,
}

impl RunState {
    pub fn new(pool: &HostPool, jobs: Vec<Job>, retry_limit: u32) -> Self {
        let hosts = pool
            .hosts()
            .iter()
            .map(|h| HostSlot {
                name: h.host.clone(),
                max_workers: h.max_workers,
                effective: h.max_workers,
                active: 0,
            })
            .collect();
        Self {
            pending: jobs.into(),
            hosts,
            retry_limit,
            succeeded: 0,
            failed: Vec::new(),
        }
    }

    pub fn host(&self, index: usize) -> &HostSlot {
        &self.hosts[index]
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the next job for the host with the most free capacity
    ///
    /// Ties go to the host declared first. The job's attempt counter is
    /// incremented here.
    pub fn next_assignment(&mut self) -> Option<(usize, Job)> {
        if self.pending.is_empty() {
            return None;
        }
        let mut best: Option<(usize, usize)> = None;
        for (index, slot) in self.hosts.iter().enumerate() {
            let free = slot.free();
            if free > 0 && best.is_none_or(|(_, best_free)| free > best_free) {
                best = Some((index, free));
            }
        }
        let (index, _) = best?;
        let mut job = self.pending.pop_front()?;
        job.attempts += 1;
        job.status = JobStatus::Running;
        self.hosts[index].active += 1;
        Some((index, job))
    }

    /// Undo an assignment that could not be started
    pub fn revert_assignment(&mut self, host_index: usize, mut job: Job) {
        self.hosts[host_index].active -= 1;
        job.attempts -= 1;
        job.status = JobStatus::Pending;
        self.pending.push_front(job);
    }

    /// Book the end of an attempt
    pub fn finish(
        &mut self,
        host_index: usize,
        mut job: Job,
        result: &Result<u64, ContractError>,
    ) -> AttemptResult {
        let slot = &mut self.hosts[host_index];
        slot.active = slot.active.saturating_sub(1);

        let error = match result {
            Ok(_) => {
                slot.effective = (slot.effective + 1).min(slot.max_workers);
                job.status = JobStatus::Succeeded;
                self.succeeded += 1;
                return AttemptResult::Succeeded;
            }
            Err(error) => error,
        };

        if matches!(error, ContractError::HostUnavailable { .. }) {
            slot.effective = slot.effective.saturating_sub(1).max(1);
        }
        job.last_error = Some(error.to_string());

        if error.is_retryable() && job.attempts <= self.retry_limit {
            job.status = JobStatus::Pending;
            self.pending.push_back(job);
            AttemptResult::Retrying
        } else {
            job.status = JobStatus::Failed;
            self.failed.push(FailedJob {
                job_id: job.id,
                kind: job.kind,
                window: job.window,
                sensors: job.sensors.iter().map(|s| s.id.to_string()).collect(),
                attempts: job.attempts,
                error: job.last_error.unwrap_or_default(),
            });
            AttemptResult::Failed
        }
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.hosts.iter().all(|h| h.active == 0)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Terminal failures ordered by job id
    pub fn take_failed(&mut self) -> Vec<FailedJob> {
        let mut failed = std::mem::take(&mut self.failed);
        failed.sort_by_key(|f| f.job_id);
        failed
    }

    /// Windows of jobs never completed, ordered and deduplicated
    pub fn pending_windows(&self) -> Vec<TimeWindow> {
        let mut windows: Vec<TimeWindow> = self.pending.iter().map(|j| j.window).collect();
        windows.sort();
        windows.dedup();
        windows
    }
}
