//! `plan` command implementation.

use anyhow::{Context, Result};
use contracts::{Job, JobKind, RunMode, TimeWindow};
use serde::Serialize;
use tracing::info;
use workflow::Workflow;

use super::load_descriptor;
use crate::cli::PlanArgs;

/// Planned run for JSON output
#[derive(Serialize)]
struct PlanInfo {
    run_name: String,
    mode: RunMode,
    granularity: String,
    job_count: usize,
    jobs: Vec<PlannedJob>,
}

#[derive(Serialize)]
struct PlannedJob {
    id: u64,
    kind: JobKind,
    window: TimeWindow,
    sensors: Vec<String>,
}

impl From<&Job> for PlannedJob {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            window: job.window,
            sensors: job.sensors.iter().map(|s| s.id.to_string()).collect(),
        }
    }
}

/// Execute the `plan` command
pub fn run_plan(args: &PlanArgs) -> Result<()> {
    info!(config = %args.config.display(), "Planning workflow");

    let descriptor = load_descriptor(&args.config)?;
    let mode = args.mode.map(RunMode::from).unwrap_or(descriptor.mode);
    let workflow = Workflow::from_descriptor(&descriptor)
        .build()
        .with_context(|| format!("Failed to build workflow '{}'", descriptor.name))?;
    let jobs = workflow
        .plan(mode)
        .with_context(|| format!("Cannot plan a {mode} run"))?;

    let plan = PlanInfo {
        run_name: workflow.name().to_string(),
        mode,
        granularity: workflow.granularity().to_string(),
        job_count: jobs.len(),
        jobs: jobs.iter().map(PlannedJob::from).collect(),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{json}");
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &PlanInfo) {
    println!(
        "\n=== {} run '{}': {} job(s), granularity {} ===\n",
        plan.mode, plan.run_name, plan.job_count, plan.granularity
    );
    for job in &plan.jobs {
        println!(
            "  #{:<5} {:<8} {}  {}",
            job.id,
            job.kind.to_string(),
            job.window,
            job.sensors.join(" x ")
        );
    }
    println!();
}
