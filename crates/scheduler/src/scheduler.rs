//! JobScheduler - dispatches jobs across the host pool
//!
//! One control loop owns the run state. Attempts run as tasks in a
//! `JoinSet`; each holds a permit of its host's semaphore for as long as it
//! runs, so a host never exceeds its worker ceiling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    AttemptResult, ContractError, Job, JobExecutor, JobReport, RunOutcome, RunStatus,
};
use observability::metrics as run_metrics;

use crate::handle::RecordSender;
use crate::pool::HostPool;
use crate::state::RunState;

/// Default per-job timeout
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Callback invoked with every attempt report
pub type JobObserver = Arc<dyn Fn(&JobReport) + Send + Sync>;

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Retries allowed per job after its first attempt
    pub retry_limit: u32,

    /// Upper bound on one attempt, sink forwarding excluded
    pub job_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_limit: 0,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

impl SchedulerConfig {
    pub fn new(retry_limit: u32, job_timeout: Duration) -> Self {
        Self {
            retry_limit,
            job_timeout,
        }
    }
}

struct InFlight {
    host_index: usize,
    job: Job,
    started: Instant,
}

/// Job scheduler bound to one host pool
pub struct JobScheduler {
    pool: HostPool,
    config: SchedulerConfig,
    observer: Option<JobObserver>,
}

impl JobScheduler {
    pub fn new(pool: HostPool, config: SchedulerConfig) -> Self {
        Self {
            pool,
            config,
            observer: None,
        }
    }

    /// Attach a per-attempt observer
    pub fn with_observer(mut self, observer: JobObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn pool(&self) -> &HostPool {
        &self.pool
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run `jobs` to completion or cancellation
    ///
    /// Successful attempts forward their records to `sink` before they count
    /// as succeeded. After `cancel` fires no new attempt starts; attempts in
    /// flight are awaited and the windows of never-finished jobs are
    /// reported as skipped.
    #[instrument(
        name = "scheduler_run",
        skip(self, jobs, executor, sink, cancel),
        fields(run = %run_name, jobs = jobs.len(), hosts = self.pool.len())
    )]
    pub async fn run<E>(
        &self,
        run_name: &str,
        jobs: Vec<Job>,
        executor: Arc<E>,
        sink: RecordSender,
        cancel: CancellationToken,
    ) -> RunOutcome
    where
        E: JobExecutor + Send + Sync + 'static,
    {
        let started = Instant::now();
        let jobs_total = jobs.len();
        let mut state = RunState::new(&self.pool, jobs, self.config.retry_limit);
        let permits: Vec<Arc<Semaphore>> = self
            .pool
            .hosts()
            .iter()
            .map(|h| Arc::new(Semaphore::new(h.max_workers)))
            .collect();

        let mut tasks: JoinSet<Result<u64, ContractError>> = JoinSet::new();
        let mut in_flight: HashMap<Id, InFlight> = HashMap::new();
        let mut records_emitted: u64 = 0;
        let mut cancelled = false;

        info!(
            capacity = self.pool.total_capacity(),
            retry_limit = self.config.retry_limit,
            timeout_secs = self.config.job_timeout.as_secs(),
            "Run started"
        );

        loop {
            if !cancelled && cancel.is_cancelled() {
                cancelled = true;
                warn!(pending = state.pending_len(), "Cancellation requested");
            }

            if !cancelled {
                while let Some((host_index, job)) = state.next_assignment() {
                    let Ok(permit) = Arc::clone(&permits[host_index]).try_acquire_owned() else {
                        state.revert_assignment(host_index, job);
                        break;
                    };
                    let host = state.host(host_index);
                    debug!(
                        job_id = job.id,
                        host = %host.name,
                        attempt = job.attempts,
                        window = %job.window,
                        "Dispatching job"
                    );
                    run_metrics::record_job_dispatched(&host.name);
                    run_metrics::record_host_active_workers(&host.name, host.active);

                    let handle = tasks.spawn(run_attempt(
                        Arc::clone(&executor),
                        host.name.clone(),
                        job.clone(),
                        self.config.job_timeout,
                        sink.clone(),
                        permit,
                    ));
                    in_flight.insert(
                        handle.id(),
                        InFlight {
                            host_index,
                            job,
                            started: Instant::now(),
                        },
                    );
                }
                run_metrics::record_queue_depth(state.pending_len());
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    warn!(
                        pending = state.pending_len(),
                        in_flight = tasks.len(),
                        "Cancellation requested, draining in-flight jobs"
                    );
                }
                Some(joined) = tasks.join_next_with_id() => {
                    let (id, result) = match joined {
                        Ok((id, result)) => (id, result),
                        Err(e) => {
                            let message = format!("worker task failed: {e}");
                            (e.id(), Err(ContractError::Other(message)))
                        }
                    };
                    let Some(done) = in_flight.remove(&id) else {
                        error!(task = %id, "Finished task has no job record");
                        continue;
                    };
                    if let Ok(records) = result {
                        records_emitted += records;
                    }
                    self.settle(&mut state, done, result);
                }
                else => break,
            }
        }

        let skipped = if cancelled {
            state.pending_windows()
        } else {
            Vec::new()
        };
        let failed = state.take_failed();
        let status = if cancelled && !skipped.is_empty() {
            RunStatus::Aborted
        } else if !failed.is_empty() {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Completed
        };

        let outcome = RunOutcome {
            run_name: run_name.to_string(),
            status,
            jobs_total,
            succeeded: state.succeeded(),
            failed,
            skipped,
            records_emitted,
            records_written: 0,
            sink_failures: 0,
            duration: started.elapsed(),
        };
        run_metrics::record_run_outcome(&outcome);

        info!(
            status = %outcome.status,
            succeeded = outcome.succeeded,
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            records = outcome.records_emitted,
            elapsed_ms = outcome.duration.as_millis() as u64,
            "Run finished"
        );
        outcome
    }

    /// Book a finished attempt and publish its report
    fn settle(&self, state: &mut RunState, done: InFlight, result: Result<u64, ContractError>) {
        let InFlight {
            host_index,
            job,
            started,
        } = done;
        let (job_id, kind, window, attempt) = (job.id, job.kind, job.window, job.attempts);
        let capacity_before = state.host(host_index).effective;

        let outcome = state.finish(host_index, job, &result);
        let host = state.host(host_index);

        let report = JobReport {
            job_id,
            kind,
            window,
            host: host.name.clone(),
            attempt,
            result: outcome,
            records: result.as_ref().copied().unwrap_or(0),
            elapsed: started.elapsed(),
            error: result.as_ref().err().map(ToString::to_string),
        };

        match outcome {
            AttemptResult::Succeeded => debug!(
                job_id,
                host = %report.host,
                records = report.records,
                "Job succeeded"
            ),
            AttemptResult::Retrying => warn!(
                job_id,
                host = %report.host,
                attempt,
                error = report.error.as_deref().unwrap_or_default(),
                "Job attempt failed, requeued"
            ),
            AttemptResult::Failed => error!(
                job_id,
                host = %report.host,
                attempt,
                window = %window,
                error = report.error.as_deref().unwrap_or_default(),
                "Job failed"
            ),
        }

        if host.effective != capacity_before {
            info!(
                host = %host.name,
                capacity = host.effective,
                max_workers = host.max_workers,
                "Host capacity changed"
            );
            run_metrics::record_host_capacity(&host.name, host.effective);
        }
        run_metrics::record_host_active_workers(&host.name, host.active);
        run_metrics::record_job_report(&report);

        if let Some(observer) = &self.observer {
            observer(&report);
        }
    }
}

/// One attempt: execute under the timeout, then forward the records
async fn run_attempt<E>(
    executor: Arc<E>,
    host: String,
    job: Job,
    timeout: Duration,
    sink: RecordSender,
    _permit: OwnedSemaphorePermit,
) -> Result<u64, ContractError>
where
    E: JobExecutor + Send + Sync + 'static,
{
    let output = match tokio::time::timeout(timeout, executor.execute(&host, &job)).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.is_missing_source() => {
            debug!(job_id = job.id, error = %e, "No source data, nothing to forward");
            return Ok(0);
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(ContractError::JobTimeout {
                job_id: job.id,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };

    sink.send_all(output.records)
        .await
        .map_err(|e| ContractError::sink_write(sink.name(), e.to_string()))
}
