//! Implementation of the `chisel deps` command.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use chisel_lib::deps::{DependencySpec, Scope};
use chisel_lib::plan::plan_from_config;

use super::TargetArgs;
use crate::output::{OutputFormat, print_info, print_json};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeFilter {
  Compile,
  Runtime,
  DevOnly,
}

impl From<ScopeFilter> for Scope {
  fn from(filter: ScopeFilter) -> Self {
    match filter {
      ScopeFilter::Compile => Scope::Compile,
      ScopeFilter::Runtime => Scope::Runtime,
      ScopeFilter::DevOnly => Scope::DevOnly,
    }
  }
}

#[derive(Args, Debug)]
pub struct DepsArgs {
  #[command(flatten)]
  pub target: TargetArgs,

  /// Only show dependencies in this scope
  #[arg(long, value_enum)]
  pub scope: Option<ScopeFilter>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

pub fn cmd_deps(args: DepsArgs) -> Result<()> {
  let config = args.target.to_config();
  let plan = plan_from_config(&config)
    .with_context(|| format!("Failed to plan {}", config.manifest_path.display()))?;

  let specs: Vec<&DependencySpec> = match args.scope {
    Some(filter) => plan.dependencies.with_scope(filter.into()).collect(),
    None => plan.dependencies.iter().collect(),
  };

  if args.output.is_json() {
    return print_json(&specs);
  }

  if specs.is_empty() {
    print_info("No dependencies");
    return Ok(());
  }

  for spec in &specs {
    let mut notes = Vec::new();
    if !spec.transitive {
      notes.push("non-transitive");
    }
    if spec.explicit_override {
      notes.push("override");
    }
    let notes = if notes.is_empty() {
      String::new()
    } else {
      format!(" ({})", notes.join(", "))
    };
    println!("{:<8} {}{}", spec.scope.as_str(), spec.coordinate, notes);
  }

  Ok(())
}
