//! Manifest types for chisel.
//!
//! # Example
//!
//! ```toml
//! [project]
//! id = "locomotion"
//! version = "1.0.0"
//! minecraft = "1.20.1"
//! repositories = ["https://maven.terraformersmc.com/"]
//!
//! [settings]
//! java = "17"
//!
//! [[rules]]
//! when = ">=1.20.5"
//! set = { java = "21" }
//!
//! [[dependencies]]
//! coordinate = "com.mojang:minecraft:${minecraft}"
//!
//! [[variants]]
//! id = "fabric"
//! flags = ["datagen"]
//!
//! [[variants.dependencies]]
//! coordinate = "net.fabricmc:fabric-loader:0.15.11"
//!
//! [[steps]]
//! name = "compile"
//! outputs = ["build/libs/${archive.name}-dev.jar"]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::deps::Scope;
use crate::settings::SettingsRule;
use crate::variant::VariantRegistry;
use crate::version::{TargetVersion, VersionError};

/// Property names supplied by the planner; manifests cannot redefine them.
pub const BUILTIN_PROPERTIES: [&str; 6] = [
  "minecraft",
  "variant",
  "mod.id",
  "mod.version",
  "archive.name",
  "archive.version",
];

/// Prefix under which derived settings are exposed as properties.
pub const SETTINGS_PROPERTY_PREFIX: &str = "settings.";

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid target version: {0}")]
  Version(#[from] VersionError),

  #[error("invalid manifest: {0}")]
  Invalid(String),
}

/// Project-wide metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDecl {
  pub id: String,
  pub version: String,
  /// Default target game version.
  pub minecraft: String,
  #[serde(default)]
  pub repositories: Vec<String>,
}

/// A dependency as written in the manifest, before interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDecl {
  pub coordinate: String,
  #[serde(default)]
  pub scope: Scope,
  #[serde(default = "default_true")]
  pub transitive: bool,
  #[serde(default, rename = "override")]
  pub explicit_override: bool,
  /// Only include for target versions matching this predicate.
  #[serde(default)]
  pub when: Option<String>,
}

/// A variant as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDecl {
  pub id: String,
  #[serde(default)]
  pub flags: Vec<String>,
  #[serde(default)]
  pub dependencies: Vec<DependencyDecl>,
  /// Steps appended after the common steps when this variant is selected.
  #[serde(default)]
  pub steps: Vec<StepDecl>,
}

/// A build step as written in the manifest, before interpolation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDecl {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub inputs: Vec<String>,
  #[serde(default)]
  pub outputs: Vec<String>,
  #[serde(default)]
  pub after: Vec<String>,
  #[serde(default)]
  pub run: Option<String>,
  #[serde(default)]
  pub when: Option<String>,
}

/// The complete declarative manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  pub project: ProjectDecl,
  #[serde(default)]
  pub properties: BTreeMap<String, String>,
  #[serde(default)]
  pub settings: BTreeMap<String, String>,
  #[serde(default)]
  pub rules: Vec<SettingsRule>,
  /// Dependencies shared by every variant.
  #[serde(default)]
  pub dependencies: Vec<DependencyDecl>,
  #[serde(default)]
  pub variants: Vec<VariantDecl>,
  #[serde(default)]
  pub steps: Vec<StepDecl>,
}

fn default_true() -> bool {
  true
}

impl Manifest {
  /// Read, parse and validate a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    debug!(path = %path.display(), "loading manifest");
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    content.parse()
  }

  /// Check structural invariants that serde cannot express.
  pub fn validate(&self) -> Result<(), ManifestError> {
    if self.project.id.trim().is_empty() {
      return Err(ManifestError::Invalid("project.id must not be empty".to_string()));
    }
    self.target_version()?;

    if self.variants.is_empty() {
      return Err(ManifestError::Invalid("at least one variant must be declared".to_string()));
    }

    let mut seen = HashSet::new();
    for variant in &self.variants {
      if variant.id.trim().is_empty() {
        return Err(ManifestError::Invalid("variant id must not be empty".to_string()));
      }
      if !seen.insert(variant.id.as_str()) {
        return Err(ManifestError::Invalid(format!("variant '{}' declared twice", variant.id)));
      }
    }

    for name in self.properties.keys() {
      if BUILTIN_PROPERTIES.contains(&name.as_str()) || name.starts_with(SETTINGS_PROPERTY_PREFIX) {
        return Err(ManifestError::Invalid(format!(
          "property '{}' is reserved and cannot be redefined",
          name
        )));
      }
    }

    Ok(())
  }

  /// The default target version declared by the project.
  pub fn target_version(&self) -> Result<TargetVersion, VersionError> {
    self.project.minecraft.parse()
  }

  /// Registry populated with every declared variant.
  pub fn registry(&self) -> VariantRegistry {
    let mut registry = VariantRegistry::new();
    for variant in &self.variants {
      registry.register(variant.id.clone(), variant.flags.iter().cloned());
    }
    registry
  }

  pub fn variant(&self, id: &str) -> Option<&VariantDecl> {
    self.variants.iter().find(|v| v.id == id)
  }

  /// The first declared variant, used when none is requested.
  pub fn default_variant(&self) -> Option<&VariantDecl> {
    self.variants.first()
  }
}

impl FromStr for Manifest {
  type Err = ManifestError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let manifest: Manifest = toml::from_str(s)?;
    manifest.validate()?;
    Ok(manifest)
  }
}
