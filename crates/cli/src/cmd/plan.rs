//! Implementation of the `chisel plan` command.
//!
//! Resolves one variant against one target version and prints the plan,
//! either as a summary or as the JSON document an external executor reads.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use chisel_lib::plan::{Plan, plan_from_config};
use chisel_lib::util::hash::{Hashable, ObjectHash};

use super::TargetArgs;
use crate::output::{OutputFormat, print_json, print_stat, symbols, truncate_hash};

#[derive(Args, Debug)]
pub struct PlanArgs {
  #[command(flatten)]
  pub target: TargetArgs,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
  id: ObjectHash,
  #[serde(flatten)]
  plan: &'a Plan,
}

pub fn cmd_plan(args: PlanArgs) -> Result<()> {
  let config = args.target.to_config();
  let plan = plan_from_config(&config)
    .with_context(|| format!("Failed to plan {}", config.manifest_path.display()))?;
  let id = plan.compute_hash().context("Failed to compute plan hash")?;

  if args.output.is_json() {
    return print_json(&PlanOutput { id, plan: &plan });
  }

  println!("Plan: {}", truncate_hash(&id.0));
  print_stat("Project", &format!("{} {}", plan.project.id, plan.project.version));
  print_stat("Variant", &describe_variant(&plan));
  print_stat("Minecraft", &plan.minecraft.to_string());
  print_stat(
    "Archive",
    &format!("{}-{}", plan.project.archive_name, plan.project.archive_version),
  );

  if !plan.settings.is_empty() {
    let settings: Vec<String> = plan.settings.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    print_stat("Settings", &settings.join(", "));
  }

  print_stat("Dependencies", &plan.dependencies.len().to_string());
  print_stat(
    "Steps",
    &format!("{} in {} wave(s)", plan.steps.len(), plan.wave_count()),
  );

  for planned in &plan.steps {
    let deps = if planned.depends_on.is_empty() {
      String::new()
    } else {
      format!(" {} {}", symbols::ARROW, planned.depends_on.join(", "))
    };
    println!("    [{}] {}{}", planned.wave, planned.step.name, deps);
  }

  Ok(())
}

fn describe_variant(plan: &Plan) -> String {
  let variant = &plan.variant;
  let mut parts = vec![variant.id().to_string()];
  if let Some(platform) = variant.platform() {
    parts.push(format!("platform: {}", platform));
  }
  if !variant.flags().is_empty() {
    let flags: Vec<&str> = variant.flags().iter().map(String::as_str).collect();
    parts.push(format!("flags: {}", flags.join(", ")));
  }
  parts.join(" | ")
}
