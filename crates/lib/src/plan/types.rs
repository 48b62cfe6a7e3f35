//! Plan and planning error types.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::deps::{DependencyError, DependencySet};
use crate::graph::{GraphError, PlannedStep};
use crate::interpolate::InterpolateError;
use crate::manifest::ManifestError;
use crate::settings::Settings;
use crate::util::hash::Hashable;
use crate::variant::{Variant, VariantError};
use crate::version::{TargetVersion, VersionError};

/// Errors that abort planning. No partial plan is produced.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Variant(#[from] VariantError),

  #[error(transparent)]
  Version(#[from] VersionError),

  #[error(transparent)]
  Dependency(#[from] DependencyError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("in {context}: {source}")]
  Interpolate {
    context: String,
    #[source]
    source: InterpolateError,
  },
}

/// Project identity carried into the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
  pub id: String,
  pub version: String,
  /// Archive base name, `<id>-<variant>`.
  pub archive_name: String,
  /// Artifact version, `<version>+<minecraft>`.
  pub archive_version: String,
}

/// The complete build plan for one variant and target version.
///
/// Handed to an external executor as JSON, or run by [`crate::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
  pub project: ProjectInfo,
  pub variant: Variant,
  pub minecraft: TargetVersion,
  /// Per-platform and per-flag boolean constants.
  pub constants: BTreeMap<String, bool>,
  pub settings: Settings,
  pub repositories: Vec<String>,
  pub dependencies: DependencySet,
  /// Steps in execution order.
  pub steps: Vec<PlannedStep>,
}

impl Hashable for Plan {}

impl Plan {
  pub fn step(&self, name: &str) -> Option<&PlannedStep> {
    self.steps.iter().find(|s| s.step.name == name)
  }

  pub fn wave_count(&self) -> usize {
    self.steps.iter().map(|s| s.wave + 1).max().unwrap_or(0)
  }
}
