//! Implementation of the `chisel run` command.
//!
//! Plans the build, then runs every step through the shell, wave by wave.
//! With `--dry-run` the steps are only logged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::info;

use chisel_lib::execute::{CommandExecutor, DryRunExecutor, ExecuteConfig, ExecutionResult, execute_plan};
use chisel_lib::plan::plan_from_config;
use chisel_lib::util::hash::Hashable;

use super::TargetArgs;
use crate::output::{OutputFormat, format_duration, print_error, print_json, print_success, print_warning};

#[derive(Args, Debug)]
pub struct RunArgs {
  #[command(flatten)]
  pub target: TargetArgs,

  /// Log each step instead of running it
  #[arg(long)]
  pub dry_run: bool,

  /// Maximum number of steps to run in parallel (defaults to CPU count)
  #[arg(short, long)]
  pub jobs: Option<usize>,

  /// Directory for build artifacts and their locks
  #[arg(long)]
  pub artifact_dir: Option<PathBuf>,

  /// Shell that runs step commands (defaults to /bin/sh, or powershell.exe on Windows)
  #[arg(long)]
  pub shell: Option<String>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Debug, Serialize)]
struct RunOutput {
  plan: String,
  dry_run: bool,
  succeeded: Vec<SucceededStep>,
  failed: Vec<FailedStep>,
  skipped: Vec<SkippedStep>,
}

#[derive(Debug, Serialize)]
struct SucceededStep {
  name: String,
  duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct FailedStep {
  name: String,
  error: String,
}

#[derive(Debug, Serialize)]
struct SkippedStep {
  name: String,
  failed_dependency: String,
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
  let mut planner = args.target.to_config();
  planner.artifact_dir = args.artifact_dir.clone();

  let plan = plan_from_config(&planner)
    .with_context(|| format!("Failed to plan {}", planner.manifest_path.display()))?;
  let id = plan.compute_hash().context("Failed to compute plan hash")?;

  let mut config = ExecuteConfig::from_planner(&planner);
  if let Some(jobs) = args.jobs {
    config.parallelism = jobs.max(1);
  }
  config.shell = args.shell.clone();

  info!(
    plan = %id,
    artifact_dir = %config.artifact_dir.display(),
    parallelism = config.parallelism,
    shell = config.shell.as_deref().unwrap_or("default"),
    dry_run = args.dry_run,
    "running plan"
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = if args.dry_run {
    rt.block_on(execute_plan(&plan, Arc::new(DryRunExecutor), &config))
  } else {
    rt.block_on(execute_plan(&plan, Arc::new(CommandExecutor), &config))
  };
  let result = outcome.context("Execution failed")?;

  let success = result.is_success();

  if args.output.is_json() {
    print_json(&to_output(&id.0, args.dry_run, result))?;
  } else {
    print_summary(&id.0, args.dry_run, &result);
  }

  if !success {
    bail!("build did not complete");
  }

  Ok(())
}

fn to_output(plan: &str, dry_run: bool, result: ExecutionResult) -> RunOutput {
  RunOutput {
    plan: plan.to_string(),
    dry_run,
    succeeded: result
      .succeeded
      .into_iter()
      .map(|(name, r)| SucceededStep {
        name,
        duration_ms: r.duration.as_millis() as u64,
      })
      .collect(),
    failed: result
      .failed
      .into_iter()
      .map(|(name, e)| FailedStep {
        name,
        error: e.to_string(),
      })
      .collect(),
    skipped: result
      .skipped
      .into_iter()
      .map(|(name, failed_dependency)| SkippedStep { name, failed_dependency })
      .collect(),
  }
}

fn print_summary(plan: &str, dry_run: bool, result: &ExecutionResult) {
  let mode = if dry_run { " (dry run)" } else { "" };
  println!("Plan: {}{}", plan, mode);

  for (name, step) in &result.succeeded {
    print_success(&format!("{} ({})", name, format_duration(step.duration)));
  }
  for (name, err) in &result.failed {
    print_error(&format!("{}: {}", name, err));
  }
  for (name, dep) in &result.skipped {
    print_warning(&format!("{} skipped: dependency '{}' did not complete", name, dep));
  }

  println!(
    "Steps: {} succeeded, {} failed, {} skipped",
    result.succeeded.len(),
    result.failed.len(),
    result.skipped.len()
  );
}
