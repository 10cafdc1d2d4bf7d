//! # Integration Tests
//!
//! End-to-end runs through builder, scheduler, engines and sinks, using the
//! synthetic ground-track reader.

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, DescriptorLoader};
    use contracts::{Granularity, RunMode};
    use workflow::Workflow;

    const DESCRIPTOR: &str = r#"
name = "usecase02_avhrr_m02_n18"
retry_limit = 1
config_root = "/etc/mms"
mode = "matchup"
granularity = "1M"

[[sensors]]
id = "avhrr-m02"
role = "primary"
start = "2006-10-30"
end = "2015-12-31"
version = "v01.2"

[[sensors]]
id = "avhrr-n18"
role = "secondary"
start = "2005-06-05"
end = "2015-12-31"
version = "v01.2"

[[hosts]]
name = "localhost"
workers = 24
"#;

    #[test]
    fn test_descriptor_to_ingestion_plan() {
        let descriptor = DescriptorLoader::load_from_str(
            &DESCRIPTOR.replace("mode = \"matchup\"", "mode = \"ingestion\""),
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(descriptor.granularity, Granularity::Months(1));

        let workflow = Workflow::from_descriptor(&descriptor).build().unwrap();
        let jobs = workflow.plan(RunMode::Ingestion).unwrap();

        // m02: Oct 2006 .. Dec 2015, n18: Jun 2005 .. Dec 2015
        assert_eq!(jobs.len(), 111 + 127);
        assert!(jobs.windows(2).all(|w| w[0].window.start <= w[1].window.start));
    }

    #[test]
    fn test_matchup_descriptor_requires_usecase() {
        let result = DescriptorLoader::load_from_str(DESCRIPTOR, ConfigFormat::Toml);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use chrono::{Datelike, TimeZone, Utc};
    use contracts::{
        AttemptResult, ContractError, Granularity, HostAllocation, JobReport, OutputRecord,
        ResultSink, RunStatus, SourceDataKind,
    };
    use ingestion::{GroundTrack, MockObservationReader};
    use scheduler::{CancellationToken, FileSink, FileSinkConfig, JobObserver, MemorySink};
    use workflow::{LocalExecutor, Workflow};

    const SAMPLES_PER_DAY: usize = 24 * 60;

    fn hosts() -> Vec<HostAllocation> {
        vec![
            HostAllocation::new("node1", 2),
            HostAllocation::new("node2", 1),
        ]
    }

    fn ingestion_workflow(retry_limit: u32) -> Workflow {
        Workflow::builder("ingest_bottle_sst", retry_limit, "/etc/mms")
            .primary_sensor("bottle-sst", "2010-01-01", "2010-01-03", "v03.3")
            .granularity(Granularity::Days(1))
            .build()
            .unwrap()
    }

    fn track_reader() -> MockObservationReader {
        MockObservationReader::new().with_track("bottle-sst", GroundTrack::default())
    }

    /// Ingestion: builder -> scheduler -> IngestionEngine -> MemorySink
    #[tokio::test]
    async fn test_e2e_ingestion() {
        let workflow = ingestion_workflow(0);
        let sink = MemorySink::new("memory");
        let records = sink.records();

        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(track_reader())),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.jobs_total, 3);
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.records_emitted, (3 * SAMPLES_PER_DAY) as u64);
        assert_eq!(outcome.records_written, (3 * SAMPLES_PER_DAY) as u64);
        assert_eq!(outcome.sink_failures, 0);
        assert_eq!(records.len(), 3 * SAMPLES_PER_DAY);
        assert!(records.records().iter().all(|r| matches!(
            r,
            OutputRecord::Observation(obs) if (-180.0..180.0).contains(&obs.longitude)
        )));
    }

    /// Matchup: rules loaded from the config root, twin tracks match exactly
    #[tokio::test]
    async fn test_e2e_matchup() {
        let config_root = tempfile::tempdir().unwrap();
        fs::write(
            config_root.path().join("mmd02.toml"),
            "name = \"mmd02\"\ntime_delta_seconds = 300\nmax_distance_km = 10.0\nvariables = [\"brightness_temp\"]\n",
        )
        .unwrap();

        let workflow = Workflow::builder("usecase02_avhrr_m02_n18", 1, config_root.path())
            .primary_sensor("avhrr-m02", "2010-06-01", "2010-06-01", "v01.2")
            .secondary_sensor("avhrr-n18", "2010-01-01", "2010-12-31", "v01.2")
            .usecase("mmd02")
            .granularity(Granularity::Hours(6))
            .build()
            .unwrap();

        let reader = MockObservationReader::new()
            .with_track("avhrr-m02", GroundTrack::default())
            .with_track("avhrr-n18", GroundTrack::default());
        let sink = MemorySink::new("memory");
        let records = sink.records();

        let outcome = workflow
            .run_matchup(
                hosts(),
                Arc::new(LocalExecutor::new(reader)),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.jobs_total, 4);
        assert_eq!(records.len(), SAMPLES_PER_DAY);
        for record in records.records() {
            let OutputRecord::Matchup(m) = record else {
                panic!("expected matchup record");
            };
            assert_eq!(m.time_delta_ms, 0);
            assert!(m.spatial_distance_km < 1e-6);
            assert!(m.values.contains_key("primary.brightness_temp"));
            assert!(m.values.contains_key("secondary.brightness_temp"));
        }
    }

    #[tokio::test]
    async fn test_e2e_corrupt_window_retried() {
        let retries = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&retries);
        let observer: JobObserver = Arc::new(move |report: &JobReport| {
            if report.result == AttemptResult::Retrying {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let workflow = Workflow::builder("ingest_bottle_sst", 1, "/etc/mms")
            .primary_sensor("bottle-sst", "2010-01-01", "2010-01-03", "v03.3")
            .granularity(Granularity::Days(1))
            .observer(observer)
            .build()
            .unwrap();
        let day2 = Utc.with_ymd_and_hms(2010, 1, 2, 0, 0, 0).unwrap();
        let reader = track_reader().fail_window("bottle-sst", day2, SourceDataKind::Corrupt, 1);
        let sink = MemorySink::new("memory");
        let records = sink.records();

        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(reader)),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(retries.load(Ordering::SeqCst), 1);
        assert_eq!(records.len(), 3 * SAMPLES_PER_DAY);
    }

    #[tokio::test]
    async fn test_e2e_bad_window_does_not_abort_run() {
        let workflow = ingestion_workflow(1);
        let day2 = Utc.with_ymd_and_hms(2010, 1, 2, 0, 0, 0).unwrap();
        let reader = track_reader().fail_window("bottle-sst", day2, SourceDataKind::Corrupt, 10);
        let sink = MemorySink::new("memory");
        let records = sink.records();

        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(reader)),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::CompletedWithFailures);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].attempts, 2);
        assert_eq!(outcome.failed_windows()[0].start, day2);
        assert_eq!(records.len(), 2 * SAMPLES_PER_DAY);
    }

    #[tokio::test]
    async fn test_e2e_missing_source_is_empty_success() {
        let workflow = ingestion_workflow(0);
        let sink = MemorySink::new("memory");
        let records = sink.records();

        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(MockObservationReader::new())),
                sink,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.succeeded, 3);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_e2e_cancelled_run_reports_skipped_windows() {
        let workflow = ingestion_workflow(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(track_reader())),
                MemorySink::new("memory"),
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Aborted);
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(outcome.records_written, 0);
    }

    #[tokio::test]
    async fn test_e2e_file_sink_rerun_is_idempotent() {
        let output = tempfile::tempdir().unwrap();
        let workflow = ingestion_workflow(0);
        let config = FileSinkConfig::new(output.path()).with_prefix(workflow.name());

        for _ in 0..2 {
            let sink = FileSink::new("jsonl", config.clone()).unwrap();
            let outcome = workflow
                .run_ingestion(
                    hosts(),
                    Arc::new(LocalExecutor::new(track_reader())),
                    sink,
                    CancellationToken::new(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.status, RunStatus::Completed);
        }

        let content = fs::read_to_string(config.path_for("observation")).unwrap();
        assert_eq!(content.lines().count(), 3 * SAMPLES_PER_DAY);
    }

    /// Sink that rejects every observation from one day
    struct DiskFullSink {
        full_day: u32,
    }

    impl ResultSink for DiskFullSink {
        fn name(&self) -> &str {
            "disk-full"
        }

        async fn append(&mut self, record: &OutputRecord) -> Result<(), ContractError> {
            match record {
                OutputRecord::Observation(obs) if obs.timestamp.day() == self.full_day => {
                    Err(ContractError::sink_write("disk-full", "no space left on device"))
                }
                _ => Ok(()),
            }
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_e2e_sink_failures_are_reported() {
        let workflow = ingestion_workflow(0);
        let outcome = workflow
            .run_ingestion(
                hosts(),
                Arc::new(LocalExecutor::new(track_reader())),
                DiskFullSink { full_day: 2 },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::CompletedWithFailures);
        assert_eq!(outcome.succeeded, 3);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.records_emitted, (3 * SAMPLES_PER_DAY) as u64);
        assert_eq!(outcome.records_written, (2 * SAMPLES_PER_DAY) as u64);
        assert_eq!(outcome.sink_failures, SAMPLES_PER_DAY as u64);
    }

    #[tokio::test]
    async fn test_e2e_invalid_host_list() {
        let workflow = ingestion_workflow(0);
        let result = workflow
            .run_ingestion(
                Vec::new(),
                Arc::new(LocalExecutor::new(track_reader())),
                MemorySink::new("memory"),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_err());
    }
}
