//! Build planning.
//!
//! Planning is synchronous and all-or-nothing:
//! 1. select the variant from the registry
//! 2. resolve the target version and derive settings from rules
//! 3. interpolate and compose the common and variant dependency sets
//! 4. interpolate the steps and order them through the task graph
//!
//! Any failure aborts with a [`PlanError`]; nothing is emitted.

mod types;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::deps::{Coordinate, DependencySet, DependencySpec, compose};
use crate::graph::{ArtifactRef, BuildStep, TaskGraphBuilder};
use crate::interpolate::substitute;
use crate::manifest::{DependencyDecl, Manifest, SETTINGS_PROPERTY_PREFIX, StepDecl};
use crate::settings::derive_settings;
use crate::variant::Variant;
use crate::version::{Predicate, TargetVersion};

pub use types::{Plan, PlanError, ProjectInfo};

/// Load the manifest named by `config` and plan it.
pub fn plan_from_config(config: &PlannerConfig) -> Result<Plan, PlanError> {
  let manifest = Manifest::load(&config.manifest_path)?;
  plan(&manifest, config)
}

/// Plan `manifest` for the variant and target version chosen by `config`.
pub fn plan(manifest: &Manifest, config: &PlannerConfig) -> Result<Plan, PlanError> {
  manifest.validate()?;

  let registry = manifest.registry();
  let variant_id = match config.variant.as_deref() {
    Some(id) => id,
    None => {
      // validate() guarantees at least one variant
      let id = manifest.default_variant().map(|v| v.id.as_str()).unwrap_or_default();
      debug!(variant = id, "no variant requested, using first declared");
      id
    }
  };
  let variant = registry.select(variant_id)?.clone();
  let variant_decl = manifest.variant(variant.id());

  let minecraft: TargetVersion = match config.minecraft.as_deref() {
    Some(v) => v.parse()?,
    None => manifest.target_version()?,
  };

  info!(variant = %variant.id(), minecraft = %minecraft, "planning build");

  let settings = derive_settings(&manifest.settings, &manifest.rules, &minecraft)?;

  let project = ProjectInfo {
    id: manifest.project.id.clone(),
    version: manifest.project.version.clone(),
    archive_name: format!("{}-{}", manifest.project.id, variant.id()),
    archive_version: format!("{}+{}", manifest.project.version, minecraft),
  };

  let properties = properties(manifest, &project, &variant, &minecraft, &settings);

  let common = dependency_set(&manifest.dependencies, "common", &properties, &minecraft)?;
  let specific = dependency_set(
    variant_decl.map(|v| v.dependencies.as_slice()).unwrap_or_default(),
    "variant",
    &properties,
    &minecraft,
  )?;
  let dependencies = compose(&common, &specific)?;

  let repositories = manifest
    .project
    .repositories
    .iter()
    .map(|r| interpolate(r, &properties, "project.repositories"))
    .collect::<Result<Vec<_>, _>>()?;

  let mut builder = TaskGraphBuilder::new();
  let variant_steps = variant_decl.map(|v| v.steps.as_slice()).unwrap_or_default();
  for decl in manifest.steps.iter().chain(variant_steps) {
    if !included(decl.when.as_deref(), &minecraft)? {
      debug!(step = %decl.name, "step excluded by version predicate");
      continue;
    }
    builder.add_step(build_step(decl, &properties)?)?;
  }
  let steps = builder.plan()?;

  let plan = Plan {
    project,
    constants: variant.constants(),
    variant,
    minecraft,
    settings,
    repositories,
    dependencies,
    steps,
  };

  info!(
    dependencies = plan.dependencies.len(),
    steps = plan.steps.len(),
    waves = plan.wave_count(),
    "plan complete"
  );

  Ok(plan)
}

/// User properties plus the planner's built-ins and derived settings.
fn properties(
  manifest: &Manifest,
  project: &ProjectInfo,
  variant: &Variant,
  minecraft: &TargetVersion,
  settings: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
  let mut props = manifest.properties.clone();
  props.insert("minecraft".to_string(), minecraft.to_string());
  props.insert("variant".to_string(), variant.id().to_string());
  props.insert("mod.id".to_string(), project.id.clone());
  props.insert("mod.version".to_string(), project.version.clone());
  props.insert("archive.name".to_string(), project.archive_name.clone());
  props.insert("archive.version".to_string(), project.archive_version.clone());
  for (key, value) in settings {
    props.insert(format!("{}{}", SETTINGS_PROPERTY_PREFIX, key), value.clone());
  }
  props
}

fn included(when: Option<&str>, minecraft: &TargetVersion) -> Result<bool, PlanError> {
  match when {
    Some(predicate) => Ok(predicate.parse::<Predicate>()?.matches(minecraft)),
    None => Ok(true),
  }
}

fn interpolate(input: &str, props: &BTreeMap<String, String>, context: &str) -> Result<String, PlanError> {
  substitute(input, props).map_err(|source| PlanError::Interpolate {
    context: context.to_string(),
    source,
  })
}

fn dependency_set(
  decls: &[DependencyDecl],
  set: &str,
  props: &BTreeMap<String, String>,
  minecraft: &TargetVersion,
) -> Result<DependencySet, PlanError> {
  let mut deps = DependencySet::new();

  for decl in decls {
    if !included(decl.when.as_deref(), minecraft)? {
      debug!(coordinate = %decl.coordinate, set, "dependency excluded by version predicate");
      continue;
    }

    let raw = interpolate(&decl.coordinate, props, &format!("{} dependency '{}'", set, decl.coordinate))?;
    let spec = DependencySpec {
      coordinate: Coordinate::parse(&raw)?,
      scope: decl.scope,
      transitive: decl.transitive,
      explicit_override: decl.explicit_override,
    };
    deps.try_insert(spec, set)?;
  }

  Ok(deps)
}

fn build_step(decl: &StepDecl, props: &BTreeMap<String, String>) -> Result<BuildStep, PlanError> {
  let context = format!("step '{}'", decl.name);
  let artifacts = |list: &[String]| -> Result<_, PlanError> {
    list
      .iter()
      .map(|a| interpolate(a, props, &context).map(|path| ArtifactRef::normalized(&path)))
      .collect()
  };

  Ok(BuildStep {
    name: decl.name.clone(),
    description: decl
      .description
      .as_deref()
      .map(|d| interpolate(d, props, &context))
      .transpose()?,
    inputs: artifacts(&decl.inputs)?,
    outputs: artifacts(&decl.outputs)?,
    after: decl.after.clone(),
    run: decl.run.as_deref().map(|r| interpolate(r, props, &context)).transpose()?,
  })
}
