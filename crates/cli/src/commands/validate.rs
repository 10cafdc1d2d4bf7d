//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RunMode, WorkflowDescriptor};
use serde::Serialize;
use tracing::info;
use workflow::Workflow;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<DescriptorSummary>,
}

#[derive(Serialize)]
struct DescriptorSummary {
    name: String,
    mode: RunMode,
    sensors: Vec<String>,
    usecase: Option<String>,
    granularity: String,
    host_count: usize,
    total_workers: usize,
    job_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating workflow descriptor");

    let result = validate_descriptor(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Workflow descriptor validation failed")
    }
}

fn validate_descriptor(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |error: String| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        error: Some(error),
        warnings: None,
        summary: None,
    };

    let descriptor = match super::load_descriptor(&args.config) {
        Ok(descriptor) => descriptor,
        Err(e) => return invalid(format!("{e:#}")),
    };

    // Loads the usecase rules as a real run would
    let workflow = match Workflow::from_descriptor(&descriptor).build() {
        Ok(workflow) => workflow,
        Err(e) => return invalid(e.to_string()),
    };
    let jobs = match workflow.plan(descriptor.mode) {
        Ok(jobs) => jobs,
        Err(e) => return invalid(e.to_string()),
    };

    let warnings = collect_warnings(&descriptor, jobs.len());
    ValidationResult {
        valid: true,
        config_path: config_path.clone(),
        error: None,
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(DescriptorSummary {
            name: descriptor.name.clone(),
            mode: descriptor.mode,
            sensors: descriptor
                .sensors
                .iter()
                .map(|s| format!("{} ({}, {})", s.id, s.role, s.version))
                .collect(),
            usecase: descriptor.usecase.clone(),
            granularity: descriptor.granularity.to_string(),
            host_count: descriptor.hosts.len(),
            total_workers: descriptor.hosts.iter().map(|h| h.max_workers).sum(),
            job_count: jobs.len(),
        }),
    }
}

/// Collect non-fatal issues
fn collect_warnings(descriptor: &WorkflowDescriptor, job_count: usize) -> Vec<String> {
    let mut warnings = Vec::new();

    if job_count == 0 {
        warnings.push("The run has no windows to process".to_string());
    }

    if descriptor.retry_limit == 0 {
        warnings.push("retry_limit is 0 - a failed window is never retried".to_string());
    }

    if descriptor.mode == RunMode::Ingestion && descriptor.usecase.is_some() {
        warnings.push("usecase is ignored by ingestion runs".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Workflow descriptor is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Run: {} ({})", summary.name, summary.mode);
            println!("  Sensors: {}", summary.sensors.join(", "));
            if let Some(ref usecase) = summary.usecase {
                println!("  Usecase: {usecase}");
            }
            println!("  Granularity: {}", summary.granularity);
            println!(
                "  Hosts: {} ({} workers)",
                summary.host_count, summary.total_workers
            );
            println!("  Jobs: {}", summary.job_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Workflow descriptor is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
