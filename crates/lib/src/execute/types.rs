//! Types for plan execution.
//!
//! This module defines the error types, result types, and configuration
//! for running a plan's steps.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::artifact_lock::ArtifactLockError;
use crate::config::PlannerConfig;

/// Errors that can occur while running a step.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// An output artifact could not be locked.
  #[error("artifact lock error: {0}")]
  Lock(#[from] ArtifactLockError),

  /// Command execution failed.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The scheduler was shut down before the step could start.
  #[error("scheduler closed before step could start")]
  SchedulerClosed,

  /// The step's task panicked or was aborted.
  #[error("step task did not complete: {0}")]
  TaskFailed(String),
}

/// Output of a successfully executed step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
  /// Trimmed stdout of the step's command, if any ran.
  pub stdout: String,
}

/// Result of a successfully executed step.
#[derive(Debug, Clone)]
pub struct StepResult {
  pub output: StepOutput,
  pub duration: Duration,
}

/// Result of executing a whole plan.
///
/// Independent branches keep running after a failure, so `failed` may hold
/// more than one step.
#[derive(Debug, Default)]
pub struct ExecutionResult {
  /// Steps that completed.
  pub succeeded: BTreeMap<String, StepResult>,

  /// Steps that ran and failed.
  pub failed: BTreeMap<String, ExecuteError>,

  /// Steps not run because a dependency failed or was skipped.
  /// Maps skipped step -> the dependency that caused it.
  pub skipped: BTreeMap<String, String>,
}

impl ExecutionResult {
  /// Returns true if every step succeeded.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  /// Returns the total number of steps processed.
  pub fn total(&self) -> usize {
    self.succeeded.len() + self.failed.len() + self.skipped.len()
  }
}

/// Configuration for plan execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of steps to run in parallel.
  pub parallelism: usize,

  /// Directory holding build artifacts and their locks.
  pub artifact_dir: PathBuf,

  /// Working directory for step commands.
  pub project_dir: PathBuf,

  /// Shell to use for command execution.
  /// If None, uses /bin/sh (Unix) or powershell.exe (Windows).
  pub shell: Option<String>,
}

impl ExecuteConfig {
  /// Execution settings for the project described by a planner config.
  pub fn from_planner(config: &PlannerConfig) -> Self {
    Self {
      parallelism: num_cpus(),
      artifact_dir: config.artifact_dir(),
      project_dir: config.project_dir(),
      shell: None,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
