//! `run` command implementation.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Duration;
use contracts::{HostAllocation, JobReport, ObservationReader, RunMode, RunOutcome, RunStatus};
use ingestion::{ArchiveReader, GroundTrack, MockObservationReader};
use observability::RunStatsAggregator;
use scheduler::{CancellationToken, FileSink, FileSinkConfig, JobObserver, LogSink};
use tracing::{info, warn};
use workflow::{LocalExecutor, Workflow};

use super::load_descriptor;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_workflow(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading workflow descriptor");

    let mut descriptor = load_descriptor(&args.config)?;
    if let Some(retry_limit) = args.retry_limit {
        info!(retry_limit, "Overriding retry limit from CLI");
        descriptor.retry_limit = retry_limit;
    }
    if let Some(secs) = args.job_timeout {
        info!(job_timeout_secs = secs, "Overriding job timeout from CLI");
        descriptor.job_timeout_secs = secs;
    }
    let mode = args.mode.map(RunMode::from).unwrap_or(descriptor.mode);

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let stats = Arc::new(Mutex::new(RunStatsAggregator::new()));
    let observer_stats = Arc::clone(&stats);
    let observer: JobObserver = Arc::new(move |report: &JobReport| {
        if let Ok(mut stats) = observer_stats.lock() {
            stats.update(report);
        }
    });

    let workflow = Workflow::from_descriptor(&descriptor)
        .sink_queue(args.sink_queue)
        .observer(observer)
        .build()
        .with_context(|| format!("Failed to build workflow '{}'", descriptor.name))?;

    info!(
        run = %workflow.name(),
        mode = %mode,
        hosts = descriptor.hosts.len(),
        granularity = %workflow.granularity(),
        "Workflow ready"
    );

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(cancel.clone()));

    let hosts = descriptor.hosts.clone();
    let launched = match (&args.archive, args.synthetic) {
        (Some(root), _) => {
            launch(&workflow, mode, hosts, ArchiveReader::new(root), args, cancel).await
        }
        (None, true) => {
            launch(&workflow, mode, hosts, synthetic_reader(&workflow), args, cancel).await
        }
        (None, false) => Err(CliError::NoObservationSource),
    };
    signal_task.abort();
    let outcome = launched?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize run outcome")?;
        println!("{json}");
    } else {
        print_outcome(&outcome);
        if let Ok(stats) = stats.lock() {
            println!("{}", stats.summary());
        }
    }

    if outcome.status == RunStatus::Completed {
        Ok(())
    } else {
        Err(CliError::RunIncomplete {
            run_name: outcome.run_name.clone(),
            status: outcome.status,
            failed: outcome.failed.len(),
            skipped: outcome.skipped.len(),
        }
        .into())
    }
}

async fn launch<R>(
    workflow: &Workflow,
    mode: RunMode,
    hosts: Vec<HostAllocation>,
    reader: R,
    args: &RunArgs,
    cancel: CancellationToken,
) -> Result<RunOutcome, CliError>
where
    R: ObservationReader + Sync + 'static,
{
    let executor = Arc::new(LocalExecutor::new(reader));
    let output = args.output.clone().or_else(|| workflow.output_dir());
    let outcome = match output {
        Some(dir) => {
            info!(output = %dir.display(), "Writing JSON Lines output");
            let config = FileSinkConfig::new(dir).with_prefix(workflow.name());
            let sink = FileSink::new("jsonl", config)?;
            workflow.run(mode, hosts, executor, sink, cancel).await?
        }
        None => {
            workflow
                .run(mode, hosts, executor, LogSink::new("log"), cancel)
                .await?
        }
    };
    Ok(outcome)
}

/// Ground tracks for every registered sensor, offset so pairs do not coincide
fn synthetic_reader(workflow: &Workflow) -> MockObservationReader {
    workflow
        .registry()
        .sensors()
        .enumerate()
        .fold(MockObservationReader::new(), |reader, (i, sensor)| {
            let track = GroundTrack {
                time_offset: Duration::seconds(30 * i as i64),
                ..GroundTrack::default()
            };
            reader.with_track(sensor.id.clone(), track)
        })
}

/// Cancel the run on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, no new jobs will start");
    cancel.cancel();
}

fn print_outcome(outcome: &RunOutcome) {
    println!("\n=== Run {} ===\n", outcome.run_name);
    println!("  Status: {}", outcome.status);
    println!("  Jobs: {} total, {} succeeded", outcome.jobs_total, outcome.succeeded);
    println!(
        "  Records: {} emitted, {} written",
        outcome.records_emitted, outcome.records_written
    );
    if outcome.sink_failures > 0 {
        println!("  Sink failures: {}", outcome.sink_failures);
    }
    println!("  Duration: {:.2}s", outcome.duration.as_secs_f64());

    if !outcome.failed.is_empty() {
        println!("\nFailed jobs ({}):", outcome.failed.len());
        for job in &outcome.failed {
            println!(
                "  - #{} {} {} [{}] after {} attempt(s): {}",
                job.job_id,
                job.kind,
                job.window,
                job.sensors.join(", "),
                job.attempts,
                job.error
            );
        }
    }

    if !outcome.skipped.is_empty() {
        println!("\nSkipped windows ({}):", outcome.skipped.len());
        for window in &outcome.skipped {
            println!("  - {window}");
        }
    }

    println!();
}
