mod deps;
mod eval;
mod plan;
mod run;
mod variants;

use std::path::PathBuf;

use clap::Args;

use chisel_lib::config::PlannerConfig;
use chisel_lib::consts::DEFAULT_MANIFEST;

pub use deps::{DepsArgs, cmd_deps};
pub use eval::{EvalArgs, cmd_eval};
pub use plan::{PlanArgs, cmd_plan};
pub use run::{RunArgs, cmd_run};
pub use variants::{VariantsArgs, cmd_variants};

/// Selects what to plan: manifest, variant and target version.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
  /// Path to the manifest
  #[arg(short, long, default_value = DEFAULT_MANIFEST)]
  pub manifest: PathBuf,

  /// Variant to plan (defaults to the first declared variant)
  #[arg(long)]
  pub variant: Option<String>,

  /// Target game version (defaults to project.minecraft)
  #[arg(long)]
  pub minecraft: Option<String>,
}

impl TargetArgs {
  pub fn to_config(&self) -> PlannerConfig {
    PlannerConfig {
      manifest_path: self.manifest.clone(),
      variant: self.variant.clone(),
      minecraft: self.minecraft.clone(),
      artifact_dir: None,
    }
  }
}
