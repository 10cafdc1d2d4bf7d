//! Workflow metrics
//!
//! Prometheus-facing recorders for jobs, hosts and records, plus an in-memory
//! aggregator for end-of-run summaries.

use std::collections::BTreeMap;

use contracts::{AttemptResult, JobReport, RunOutcome};
use metrics::{counter, gauge, histogram};

/// Record one finished job attempt
///
/// Called by the scheduler for every attempt, successful or not.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_job_report;
///
/// record_job_report(&report);
/// ```
pub fn record_job_report(report: &JobReport) {
    let kind = report.kind.to_string();
    counter!(
        "mms_jobs_attempts_total",
        "kind" => kind.clone(),
        "host" => report.host.clone(),
        "result" => report.result.to_string()
    )
    .increment(1);

    histogram!("mms_job_duration_seconds", "kind" => kind.clone())
        .record(report.elapsed.as_secs_f64());

    match report.result {
        AttemptResult::Succeeded => {
            counter!("mms_jobs_succeeded_total", "kind" => kind).increment(1);
        }
        AttemptResult::Retrying => {
            counter!("mms_jobs_retried_total", "kind" => kind).increment(1);
        }
        AttemptResult::Failed => {
            counter!("mms_jobs_failed_total", "kind" => kind).increment(1);
        }
    }

    if report.records > 0 {
        counter!("mms_records_emitted_total").increment(report.records);
    }
}

/// Record a job dispatch
pub fn record_job_dispatched(host: &str) {
    counter!("mms_jobs_dispatched_total", "host" => host.to_string()).increment(1);
}

/// Record the number of busy worker slots on a host
pub fn record_host_active_workers(host: &str, active: usize) {
    gauge!("mms_host_active_workers", "host" => host.to_string()).set(active as f64);
}

/// Record a host capacity change after demotion or recovery
pub fn record_host_capacity(host: &str, capacity: usize) {
    gauge!("mms_host_effective_capacity", "host" => host.to_string()).set(capacity as f64);
}

/// Record the pending queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("mms_jobs_pending").set(depth as f64);
}

/// Record a finished run
pub fn record_run_outcome(outcome: &RunOutcome) {
    counter!("mms_runs_total", "status" => outcome.status.to_string()).increment(1);
    histogram!("mms_run_duration_seconds").record(outcome.duration.as_secs_f64());
}

/// Record the final counters of a result sink
pub fn record_sink_totals(sink: &str, written: u64, failures: u64) {
    counter!("mms_records_written_total", "sink" => sink.to_string()).increment(written);
    if failures > 0 {
        counter!("mms_sink_failures_total", "sink" => sink.to_string()).increment(failures);
    }
}

/// Run statistics aggregator
///
/// Aggregates job reports in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct RunStatsAggregator {
    /// Attempts observed
    pub attempts: u64,

    pub succeeded: u64,

    /// Attempts that were requeued
    pub retried: u64,

    /// Jobs that went terminal
    pub failed: u64,

    pub records: u64,

    /// Job duration statistics (seconds)
    pub duration_stats: RunningStats,

    /// Attempts per host
    pub host_attempts: BTreeMap<String, u64>,

    /// Failed attempts per host
    pub host_failures: BTreeMap<String, u64>,
}

impl RunStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregate statistics
    pub fn update(&mut self, report: &JobReport) {
        self.attempts += 1;
        self.records += report.records;
        self.duration_stats.push(report.elapsed.as_secs_f64());
        *self.host_attempts.entry(report.host.clone()).or_insert(0) += 1;

        match report.result {
            AttemptResult::Succeeded => self.succeeded += 1,
            AttemptResult::Retrying => self.retried += 1,
            AttemptResult::Failed => self.failed += 1,
        }
        if report.result != AttemptResult::Succeeded {
            *self.host_failures.entry(report.host.clone()).or_insert(0) += 1;
        }
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            attempts: self.attempts,
            succeeded: self.succeeded,
            retried: self.retried,
            failed: self.failed,
            records: self.records,
            retry_rate: if self.attempts > 0 {
                self.retried as f64 / self.attempts as f64 * 100.0
            } else {
                0.0
            },
            job_duration_secs: StatsSummary::from(&self.duration_stats),
            host_attempts: self.host_attempts.clone(),
            host_failures: self.host_failures.clone(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub attempts: u64,
    pub succeeded: u64,
    pub retried: u64,
    pub failed: u64,
    pub records: u64,
    pub retry_rate: f64,
    pub job_duration_secs: StatsSummary,
    pub host_attempts: BTreeMap<String, u64>,
    pub host_failures: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Metrics Summary ===")?;
        writeln!(f, "Job attempts: {}", self.attempts)?;
        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(
            f,
            "Retried: {} ({:.2}%)",
            self.retried, self.retry_rate
        )?;
        writeln!(f, "Failed (terminal): {}", self.failed)?;
        writeln!(f, "Records written: {}", self.records)?;
        writeln!(f, "Job duration (s): {}", self.job_duration_secs)?;

        if !self.host_attempts.is_empty() {
            writeln!(f, "Attempts per host:")?;
            for (host, count) in &self.host_attempts {
                let failures = self.host_failures.get(host).copied().unwrap_or(0);
                writeln!(f, "  {}: {} ({} failed)", host, count, failures)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{JobKind, TimeWindow};
    use std::time::Duration;

    fn report(host: &str, result: AttemptResult, records: u64, secs: f64) -> JobReport {
        JobReport {
            job_id: 1,
            kind: JobKind::Matchup,
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2010, 2, 1, 0, 0, 0).unwrap(),
            ),
            host: host.into(),
            attempt: 1,
            result,
            records,
            elapsed: Duration::from_secs_f64(secs),
            error: None,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = RunStatsAggregator::new();

        aggregator.update(&report("node1", AttemptResult::Succeeded, 40, 2.0));
        aggregator.update(&report("node1", AttemptResult::Retrying, 0, 1.0));
        aggregator.update(&report("node2", AttemptResult::Succeeded, 2, 3.0));

        assert_eq!(aggregator.attempts, 3);
        assert_eq!(aggregator.succeeded, 2);
        assert_eq!(aggregator.retried, 1);
        assert_eq!(aggregator.records, 42);
        assert_eq!(aggregator.host_attempts.get("node1"), Some(&2));
        assert_eq!(aggregator.host_failures.get("node1"), Some(&1));
        assert!((aggregator.duration_stats.mean() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = RunStatsAggregator::new();
        for _ in 0..3 {
            aggregator.update(&report("localhost", AttemptResult::Succeeded, 5, 1.0));
        }
        aggregator.update(&report("localhost", AttemptResult::Retrying, 0, 1.0));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Job attempts: 4"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("localhost: 4 (1 failed)"));
    }
}
