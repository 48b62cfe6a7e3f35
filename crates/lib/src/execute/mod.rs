//! Parallel execution of a plan's steps.
//!
//! This module handles:
//! - Wave-based execution with bounded parallelism
//! - Per-artifact locking of step outputs
//! - Failure propagation and skip tracking

mod executor;
mod types;

pub use executor::{CommandExecutor, DryRunExecutor, StepExecutor};
pub use types::*;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::artifact_lock::ArtifactLock;
use crate::graph::{ArtifactRef, PlannedStep, waves};
use crate::plan::Plan;

/// Execute every step of a plan.
///
/// Steps run wave by wave. Inside a wave, steps run concurrently up to
/// `config.parallelism`. A step whose dependency failed or was skipped is
/// itself skipped; unrelated steps keep running.
pub async fn execute_plan<E: StepExecutor>(
  plan: &Plan,
  executor: Arc<E>,
  config: &ExecuteConfig,
) -> Result<ExecutionResult, ExecuteError> {
  info!(
    variant = %plan.variant.id(),
    minecraft = %plan.minecraft,
    step_count = plan.steps.len(),
    "starting plan execution"
  );

  let waves = waves(&plan.steps);
  info!(wave_count = waves.len(), "computed execution waves");

  let mut result = ExecutionResult::default();
  let mut unusable: HashSet<String> = HashSet::new();
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, steps = wave.len(), "executing wave");

    let mut ready = Vec::new();
    for step in wave {
      match step.depends_on.iter().find(|dep| unusable.contains(*dep)) {
        Some(failed_dep) => {
          warn!(
            step = %step.step.name,
            failed_dep = %failed_dep,
            "skipping step due to failed dependency"
          );
          result.skipped.insert(step.step.name.clone(), failed_dep.clone());
          unusable.insert(step.step.name.clone());
        }
        None => ready.push((*step).clone()),
      }
    }

    if ready.is_empty() {
      continue;
    }

    for (name, outcome) in execute_wave(ready, executor.clone(), config, semaphore.clone()).await {
      match outcome {
        Ok(step_result) => {
          info!(step = %name, duration_ms = step_result.duration.as_millis() as u64, "step succeeded");
          result.succeeded.insert(name, step_result);
        }
        Err(e) => {
          error!(step = %name, error = %e, "step failed");
          unusable.insert(name.clone());
          result.failed.insert(name, e);
        }
      }
    }
  }

  info!(
    succeeded = result.succeeded.len(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "plan execution complete"
  );

  Ok(result)
}

/// Run one wave of steps in parallel.
async fn execute_wave<E: StepExecutor>(
  steps: Vec<PlannedStep>,
  executor: Arc<E>,
  config: &ExecuteConfig,
  semaphore: Arc<Semaphore>,
) -> Vec<(String, Result<StepResult, ExecuteError>)> {
  let mut join_set = JoinSet::new();
  let mut pending: HashSet<String> = steps.iter().map(|s| s.step.name.clone()).collect();

  for step in steps {
    let executor = executor.clone();
    let config = config.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let name = step.step.name.clone();
      let outcome = match semaphore.acquire_owned().await {
        Ok(_permit) => run_step(&step, executor.as_ref(), &config).await,
        Err(_) => Err(ExecuteError::SchedulerClosed),
      };
      (name, outcome)
    });
  }

  let mut results = Vec::new();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((name, outcome)) => {
        pending.remove(&name);
        results.push((name, outcome));
      }
      Err(e) => {
        error!(error = %e, "step task panicked");
      }
    }
  }

  // A panicked task loses its name; whatever did not report back failed.
  for name in pending {
    results.push((name, Err(ExecuteError::TaskFailed("task panicked or was cancelled".to_string()))));
  }

  results
}

/// Lock the step's outputs and hand it to the executor.
async fn run_step<E: StepExecutor>(
  step: &PlannedStep,
  executor: &E,
  config: &ExecuteConfig,
) -> Result<StepResult, ExecuteError> {
  let outputs: Vec<ArtifactRef> = step.step.outputs.iter().cloned().collect();
  let artifact_dir = config.artifact_dir.clone();
  let name = step.step.name.clone();
  let _locks = tokio::task::spawn_blocking(move || {
    outputs
      .iter()
      .map(|output| ArtifactLock::acquire(&artifact_dir, output, &name))
      .collect::<Result<Vec<_>, _>>()
  })
  .await
  .map_err(|e| ExecuteError::TaskFailed(e.to_string()))??;

  debug!(step = %step.step.name, outputs = step.step.outputs.len(), "outputs locked");

  let start = Instant::now();
  let output = executor.run(step, config).await?;

  Ok(StepResult {
    output,
    duration: start.elapsed(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PlannerConfig;
  use crate::graph::{BuildStep, TaskGraphBuilder};
  use crate::manifest::Manifest;
  use crate::util::testutil::{fail_cmd, ok_cmd, write_file_cmd};
  use tempfile::TempDir;
  use tracing_test::traced_test;

  const MANIFEST: &str = r#"
[project]
id = "locomotion"
version = "1.0.0"
minecraft = "1.20.1"

[[variants]]
id = "fabric"
"#;

  fn test_plan(steps: Vec<BuildStep>) -> Plan {
    let manifest: Manifest = MANIFEST.parse().unwrap();
    let mut plan = crate::plan::plan(&manifest, &PlannerConfig::default()).unwrap();

    let mut builder = TaskGraphBuilder::new();
    for step in steps {
      builder.add_step(step).unwrap();
    }
    plan.steps = builder.plan().unwrap();
    plan
  }

  fn test_config(dir: &TempDir) -> ExecuteConfig {
    ExecuteConfig {
      parallelism: 4,
      artifact_dir: dir.path().join("artifacts"),
      project_dir: dir.path().to_path_buf(),
      shell: None,
    }
  }

  #[tokio::test]
  async fn execute_empty_plan() {
    let temp = TempDir::new().unwrap();
    let plan = test_plan(Vec::new());

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &test_config(&temp))
      .await
      .unwrap();

    assert!(result.is_success());
    assert_eq!(result.total(), 0);
  }

  #[tokio::test]
  async fn execute_chain_in_order() {
    let temp = TempDir::new().unwrap();
    let plan = test_plan(vec![
      BuildStep::new("compile")
        .output("dev.jar")
        .run(write_file_cmd("dev.jar", "compiled")),
      BuildStep::new("shade")
        .input("dev.jar")
        .output("shaded.jar")
        .run(write_file_cmd("shaded.jar", "shaded")),
      BuildStep::new("remap").input("shaded.jar").run(ok_cmd()),
    ]);

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &test_config(&temp))
      .await
      .unwrap();

    assert!(result.is_success());
    assert_eq!(result.succeeded.len(), 3);
    assert!(temp.path().join("dev.jar").exists());
    assert!(temp.path().join("shaded.jar").exists());
  }

  #[tokio::test]
  #[traced_test]
  async fn failure_skips_dependents_only() {
    let temp = TempDir::new().unwrap();
    let plan = test_plan(vec![
      BuildStep::new("compile").output("dev.jar").run(fail_cmd()),
      BuildStep::new("shade").input("dev.jar").output("shaded.jar").run(ok_cmd()),
      BuildStep::new("remap").input("shaded.jar").run(ok_cmd()),
      BuildStep::new("docs").run(ok_cmd()),
    ]);

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &test_config(&temp))
      .await
      .unwrap();

    assert!(!result.is_success());
    assert!(result.failed.contains_key("compile"));
    assert_eq!(result.skipped.get("shade").map(String::as_str), Some("compile"));
    assert_eq!(result.skipped.get("remap").map(String::as_str), Some("shade"));
    assert!(result.succeeded.contains_key("docs"));
    assert_eq!(result.total(), 4);
    assert!(logs_contain("skipping step due to failed dependency"));
  }

  #[tokio::test]
  async fn independent_failures_are_all_reported() {
    let temp = TempDir::new().unwrap();
    let plan = test_plan(vec![
      BuildStep::new("fabric-jar").run(fail_cmd()),
      BuildStep::new("forge-jar").run(fail_cmd()),
      BuildStep::new("sources").run(ok_cmd()),
    ]);

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &test_config(&temp))
      .await
      .unwrap();

    assert_eq!(result.failed.len(), 2);
    assert!(result.succeeded.contains_key("sources"));
  }

  #[tokio::test]
  async fn held_artifact_lock_fails_step() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let plan = test_plan(vec![BuildStep::new("remap").output("mod.jar").run(ok_cmd())]);

    let _held = ArtifactLock::acquire(&config.artifact_dir, &"mod.jar".into(), "other").unwrap();

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &config).await.unwrap();

    assert!(matches!(result.failed.get("remap"), Some(ExecuteError::Lock(_))));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn concurrent_aliased_outputs_contend() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    // A deserialized plan is not re-validated, so aliases can reach execution.
    let mut plan = test_plan(Vec::new());
    plan.steps = ["out/x.jar", "out/./x.jar"]
      .iter()
      .enumerate()
      .map(|(i, output)| PlannedStep {
        step: BuildStep {
          name: format!("jar-{}", i),
          outputs: [ArtifactRef::from(*output)].into(),
          run: Some("sleep 1".to_string()),
          ..Default::default()
        },
        depends_on: Vec::new(),
        wave: 0,
      })
      .collect();

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &config).await.unwrap();

    assert_eq!(result.succeeded.len(), 1);
    assert_eq!(result.failed.len(), 1);
    assert!(matches!(result.failed.values().next(), Some(ExecuteError::Lock(_))));
  }

  #[tokio::test]
  async fn locks_released_after_step() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let plan = test_plan(vec![BuildStep::new("remap").output("mod.jar").run(ok_cmd())]);

    let result = execute_plan(&plan, Arc::new(CommandExecutor), &config).await.unwrap();
    assert!(result.is_success());

    assert!(ArtifactLock::acquire(&config.artifact_dir, &"mod.jar".into(), "next").is_ok());
  }

  #[tokio::test]
  async fn dry_run_runs_nothing() {
    let temp = TempDir::new().unwrap();
    let plan = test_plan(vec![
      BuildStep::new("compile").output("dev.jar").run(fail_cmd()),
      BuildStep::new("shade").input("dev.jar").run(write_file_cmd("shaded.jar", "x")),
    ]);

    let result = execute_plan(&plan, Arc::new(DryRunExecutor), &test_config(&temp))
      .await
      .unwrap();

    assert!(result.is_success());
    assert!(!temp.path().join("shaded.jar").exists());
  }
}
