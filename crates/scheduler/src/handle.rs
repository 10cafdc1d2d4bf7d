//! SinkHandle - owns a sink in an isolated worker task
//!
//! Producers enqueue through a bounded channel and wait when it is full, so
//! records are never dropped. A failed append is counted and logged; it does
//! not stop the worker.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{OutputRecord, ResultSink};
use observability::metrics as run_metrics;

use crate::error::SchedulerError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Default sink queue capacity
pub const DEFAULT_SINK_QUEUE: usize = 1024;

/// Handle to a running sink worker
pub struct SinkHandle {
    sender: RecordSender,
    worker_handle: JoinHandle<()>,
}

/// Cloneable producer side of a sink worker
#[derive(Clone)]
pub struct RecordSender {
    name: Arc<str>,
    tx: mpsc::Sender<OutputRecord>,
    metrics: Arc<SinkMetrics>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: ResultSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name: Arc<str> = Arc::from(sink.name());
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.to_string();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            sender: RecordSender { name, tx, metrics },
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.sender.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.sender.metrics
    }

    /// Producer handle for worker tasks
    pub fn sender(&self) -> RecordSender {
        self.sender.clone()
    }

    /// Enqueue one record, waiting for queue space
    pub async fn send(&self, record: OutputRecord) -> Result<(), SchedulerError> {
        self.sender.send(record).await
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Waits until every queued record is appended, then flushes and closes
    /// the sink. Outstanding `RecordSender` clones keep the worker alive.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.sender.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        let Self {
            sender,
            worker_handle,
        } = self;
        let metrics = Arc::clone(&sender.metrics);
        let name = sender.name.to_string();
        drop(sender);

        if let Err(e) = worker_handle.await {
            error!(sink = %name, error = ?e, "Worker task panicked");
        }
        let snapshot = metrics.snapshot();
        run_metrics::record_sink_totals(&name, snapshot.write_count, snapshot.failure_count);
        debug!(sink = %name, "SinkHandle shutdown complete");
        snapshot
    }
}

impl RecordSender {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue one record, waiting for queue space
    pub async fn send(&self, record: OutputRecord) -> Result<(), SchedulerError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| SchedulerError::SinkClosed {
                sink_name: self.name.to_string(),
            })?;
        self.metrics.inc_sent_count();
        Ok(())
    }

    /// Enqueue a batch, returning the number of records accepted
    pub async fn send_all(&self, records: Vec<OutputRecord>) -> Result<u64, SchedulerError> {
        let mut sent = 0;
        for record in records {
            self.send(record).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// Worker task that consumes records and appends them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: ResultSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<OutputRecord>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(record) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.append(&record).await {
            Ok(()) => {
                metrics.inc_write_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    record = %record.record_key(),
                    error = %e,
                    "Append failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{ContractError, ObservationRecord};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl ResultSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn append(&mut self, _record: &OutputRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn record(i: u32) -> OutputRecord {
        ObservationRecord::new(
            "bottle-sst",
            Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, i).unwrap(),
            0.0,
            0.0,
            format!("row-{i}"),
        )
        .into()
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "test".to_string(),
            write_count: Arc::clone(&write_count),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..5 {
            handle.send(record(i)).await.unwrap();
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(snapshot.write_count, 5);
    }

    #[tokio::test]
    async fn test_slow_sink_never_drops() {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "slow".to_string(),
            write_count: Arc::clone(&write_count),
            should_fail: false,
            delay_ms: 5,
        };

        let handle = SinkHandle::spawn(sink, 2);
        let sender = handle.sender();
        let sent = sender
            .send_all((0..20).map(record).collect())
            .await
            .unwrap();
        assert_eq!(sent, 20);
        drop(sender);

        let snapshot = handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 20);
        assert_eq!(snapshot.sent_count, 20);
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let sink = MockSink {
            name: "failing".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..3 {
            handle.send(record(i)).await.unwrap();
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.failure_count, 3);
        assert_eq!(snapshot.write_count, 0);
    }
}
