//! Planner configuration.
//!
//! A [`PlannerConfig`] is built once by the caller (normally the CLI) and
//! passed explicitly through planning and execution.

use std::path::{Path, PathBuf};

use crate::consts::{ARTIFACT_DIR_ENV, DEFAULT_ARTIFACT_DIR, DEFAULT_MANIFEST};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
  /// Path to the manifest file.
  pub manifest_path: PathBuf,
  /// Variant to select; the first declared variant when `None`.
  pub variant: Option<String>,
  /// Target version overriding `project.minecraft`.
  pub minecraft: Option<String>,
  /// Artifact directory override. See [`PlannerConfig::artifact_dir`].
  pub artifact_dir: Option<PathBuf>,
}

impl Default for PlannerConfig {
  fn default() -> Self {
    Self {
      manifest_path: PathBuf::from(DEFAULT_MANIFEST),
      variant: None,
      minecraft: None,
      artifact_dir: None,
    }
  }
}

impl PlannerConfig {
  pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
    Self {
      manifest_path: manifest_path.into(),
      ..Default::default()
    }
  }

  pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
    self.variant = Some(variant.into());
    self
  }

  pub fn with_minecraft(mut self, version: impl Into<String>) -> Self {
    self.minecraft = Some(version.into());
    self
  }

  /// Directory containing the manifest; steps run from here.
  pub fn project_dir(&self) -> PathBuf {
    match self.manifest_path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    }
  }

  /// Resolve the artifact directory.
  ///
  /// Precedence: explicit override, then the `CHISEL_ARTIFACT_DIR`
  /// environment variable, then `<project>/build/artifacts`. Relative paths
  /// are taken relative to the project directory.
  pub fn artifact_dir(&self) -> PathBuf {
    let project = self.project_dir();
    let chosen = self
      .artifact_dir
      .clone()
      .or_else(|| std::env::var_os(ARTIFACT_DIR_ENV).map(PathBuf::from))
      .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR));

    absolutize(&project, chosen)
  }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
  if path.is_absolute() { path } else { base.join(path) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn project_dir_of_bare_filename_is_cwd() {
    let config = PlannerConfig::new("chisel.toml");
    assert_eq!(config.project_dir(), PathBuf::from("."));
  }

  #[test]
  fn project_dir_is_manifest_parent() {
    let config = PlannerConfig::new("/work/mod/chisel.toml");
    assert_eq!(config.project_dir(), PathBuf::from("/work/mod"));
  }

  #[test]
  #[serial]
  fn default_artifact_dir() {
    temp_env::with_var_unset(ARTIFACT_DIR_ENV, || {
      let config = PlannerConfig::new("/work/mod/chisel.toml");
      assert_eq!(config.artifact_dir(), PathBuf::from("/work/mod/build/artifacts"));
    });
  }

  #[cfg(unix)]
  #[test]
  #[serial]
  fn env_overrides_default() {
    temp_env::with_var(ARTIFACT_DIR_ENV, Some("/tmp/chisel-out"), || {
      let config = PlannerConfig::new("/work/mod/chisel.toml");
      assert_eq!(config.artifact_dir(), PathBuf::from("/tmp/chisel-out"));
    });
  }

  #[test]
  #[serial]
  fn explicit_overrides_env() {
    temp_env::with_var(ARTIFACT_DIR_ENV, Some("/tmp/chisel-out"), || {
      let mut config = PlannerConfig::new("/work/mod/chisel.toml");
      config.artifact_dir = Some(PathBuf::from("out"));
      assert_eq!(config.artifact_dir(), PathBuf::from("/work/mod/out"));
    });
  }

  #[test]
  fn builder_methods() {
    let config = PlannerConfig::default().with_variant("forge").with_minecraft("1.21");
    assert_eq!(config.variant.as_deref(), Some("forge"));
    assert_eq!(config.minecraft.as_deref(), Some("1.21"));
    assert_eq!(config.manifest_path, PathBuf::from(DEFAULT_MANIFEST));
  }
}
