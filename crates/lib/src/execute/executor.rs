//! Step executors.
//!
//! The planner does not compile or package anything itself. A
//! [`StepExecutor`] hands each step to the external toolchain.

use std::future::Future;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::graph::PlannedStep;

use super::types::{ExecuteConfig, ExecuteError, StepOutput};

/// Runs a single planned step.
pub trait StepExecutor: Send + Sync + 'static {
  fn run(
    &self,
    step: &PlannedStep,
    config: &ExecuteConfig,
  ) -> impl Future<Output = Result<StepOutput, ExecuteError>> + Send;
}

/// Runs each step's `run` command through the shell from the project
/// directory. Steps without a command succeed immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl StepExecutor for CommandExecutor {
  async fn run(&self, step: &PlannedStep, config: &ExecuteConfig) -> Result<StepOutput, ExecuteError> {
    let Some(cmd) = step.step.run.as_deref() else {
      debug!(step = %step.step.name, "no command, nothing to run");
      return Ok(StepOutput::default());
    };

    let stdout = execute_cmd(cmd, &step.step.name, config, &config.project_dir).await?;
    Ok(StepOutput { stdout })
  }
}

/// Logs what would run without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl StepExecutor for DryRunExecutor {
  async fn run(&self, step: &PlannedStep, _config: &ExecuteConfig) -> Result<StepOutput, ExecuteError> {
    info!(
      step = %step.step.name,
      cmd = step.step.run.as_deref().unwrap_or("-"),
      "dry run"
    );
    Ok(StepOutput::default())
  }
}

/// Execute a shell command for a step.
///
/// The step's name and the artifact directory are exported as
/// `CHISEL_STEP` and `CHISEL_ARTIFACT_DIR`.
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
async fn execute_cmd(cmd: &str, step: &str, config: &ExecuteConfig, cwd: &Path) -> Result<String, ExecuteError> {
  info!(step = %step, cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(config.shell.as_deref());

  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .env("CHISEL_STEP", step)
    .env("CHISEL_ARTIFACT_DIR", &config.artifact_dir);

  debug!(shell = %shell_cmd, working_dir = ?cwd, "spawning process");

  let output = command.output().await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments.
///
/// An override shell gets the flags its file name calls for.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let stem = Path::new(shell)
      .file_stem()
      .map(|s| s.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();
    let args: &[&str] = match stem.as_str() {
      "powershell" | "pwsh" => &["-NoProfile", "-Command"],
      "cmd" => &["/C"],
      _ => &["-c"],
    };
    return (shell.to_string(), args.iter().map(|a| a.to_string()).collect());
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
