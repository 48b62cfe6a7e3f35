//! Implementation of the `chisel eval` command.
//!
//! Prints `true` or `false`. The target is `--minecraft` when given,
//! otherwise the manifest's `project.minecraft`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use chisel_lib::consts::DEFAULT_MANIFEST;
use chisel_lib::manifest::Manifest;
use chisel_lib::version::{TargetVersion, evaluate};

use crate::output::{OutputFormat, print_json};

#[derive(Args, Debug)]
pub struct EvalArgs {
  /// Predicate to evaluate, e.g. ">=1.20.5 <1.21"
  pub predicate: String,

  /// Target game version
  #[arg(long)]
  pub minecraft: Option<String>,

  /// Manifest supplying the target when --minecraft is absent
  #[arg(short, long, default_value = DEFAULT_MANIFEST)]
  pub manifest: PathBuf,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct EvalOutput<'a> {
  predicate: &'a str,
  minecraft: &'a TargetVersion,
  matches: bool,
}

pub fn cmd_eval(args: EvalArgs) -> Result<()> {
  let target: TargetVersion = match args.minecraft.as_deref() {
    Some(version) => version
      .parse()
      .with_context(|| format!("Invalid target version: {}", version))?,
    None => Manifest::load(&args.manifest)
      .with_context(|| format!("Failed to load {}", args.manifest.display()))?
      .target_version()
      .context("Invalid project.minecraft")?,
  };

  let matches = evaluate(&args.predicate, &target)
    .with_context(|| format!("Failed to evaluate predicate: {}", args.predicate))?;

  if args.output.is_json() {
    return print_json(&EvalOutput {
      predicate: &args.predicate,
      minecraft: &target,
      matches,
    });
  }

  println!("{}", matches);
  Ok(())
}
