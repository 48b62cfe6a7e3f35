//! Implementation of the `chisel variants` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use chisel_lib::consts::DEFAULT_MANIFEST;
use chisel_lib::manifest::Manifest;

use crate::output::{OutputFormat, print_info, print_json};

#[derive(Args, Debug)]
pub struct VariantsArgs {
  /// Path to the manifest
  #[arg(short, long, default_value = DEFAULT_MANIFEST)]
  pub manifest: PathBuf,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct VariantItem<'a> {
  id: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  platform: Option<&'static str>,
  flags: Vec<&'a str>,
  default: bool,
}

pub fn cmd_variants(args: VariantsArgs) -> Result<()> {
  let manifest =
    Manifest::load(&args.manifest).with_context(|| format!("Failed to load {}", args.manifest.display()))?;
  let registry = manifest.registry();

  let items: Vec<VariantItem> = registry
    .variants()
    .enumerate()
    .map(|(idx, variant)| VariantItem {
      id: variant.id(),
      platform: variant.platform().map(|p| p.as_str()),
      flags: variant.flags().iter().map(String::as_str).collect(),
      default: idx == 0,
    })
    .collect();

  if args.output.is_json() {
    return print_json(&items);
  }

  for item in &items {
    let default_marker = if item.default { " (default)" } else { "" };
    let flags = if item.flags.is_empty() {
      String::new()
    } else {
      format!(" [{}]", item.flags.join(", "))
    };
    println!("{}{}{}", item.id, default_marker, flags);
  }

  print_info(&format!("{} variant(s) total", items.len()));
  Ok(())
}
