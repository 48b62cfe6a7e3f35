//! Platform variants and the registry that selects one.
//!
//! Every variant carries a set of active feature flags. Variants whose id
//! names a known mod-loader platform also map to a [`Platform`], which is
//! what the per-platform constants are derived from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors from variant selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
  #[error("unknown variant '{id}' (known: {})", .known.join(", "))]
  UnknownVariant { id: String, known: Vec<String> },
}

/// A known mod-loader platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Fabric,
  Forge,
  NeoForge,
  Quilt,
}

impl Platform {
  pub const ALL: [Platform; 4] = [Platform::Fabric, Platform::Forge, Platform::NeoForge, Platform::Quilt];

  pub fn as_str(self) -> &'static str {
    match self {
      Platform::Fabric => "fabric",
      Platform::Forge => "forge",
      Platform::NeoForge => "neoforge",
      Platform::Quilt => "quilt",
    }
  }

  /// Recognize a platform from a variant id (case-insensitive).
  pub fn from_id(id: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|p| p.as_str().eq_ignore_ascii_case(id))
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A named build target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
  id: String,
  flags: BTreeSet<String>,
}

impl Variant {
  pub fn new<I, S>(id: impl Into<String>, flags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      id: id.into(),
      flags: flags.into_iter().map(Into::into).collect(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn flags(&self) -> &BTreeSet<String> {
    &self.flags
  }

  pub fn has_flag(&self, flag: &str) -> bool {
    self.flags.contains(flag)
  }

  pub fn platform(&self) -> Option<Platform> {
    Platform::from_id(&self.id)
  }

  /// Boolean constants visible to conditional sources for this variant.
  ///
  /// One entry per known platform, true only for this variant's own
  /// platform, followed by every active feature flag set to true.
  pub fn constants(&self) -> BTreeMap<String, bool> {
    let own = self.platform();
    let mut constants: BTreeMap<String, bool> = Platform::ALL
      .into_iter()
      .map(|p| (p.as_str().to_string(), own == Some(p)))
      .collect();

    for flag in &self.flags {
      constants.insert(flag.clone(), true);
    }

    constants
  }
}

/// Registry of variants known to the current configuration.
#[derive(Debug, Default)]
pub struct VariantRegistry {
  variants: Vec<Variant>,
  index: HashMap<String, usize>,
}

impl VariantRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a variant. Registering an existing id replaces its flags
  /// but keeps its original position.
  pub fn register<I, S>(&mut self, id: impl Into<String>, flags: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let variant = Variant::new(id, flags);
    debug!(variant = %variant.id, flags = ?variant.flags, "registering variant");

    match self.index.get(&variant.id) {
      Some(&idx) => self.variants[idx] = variant,
      None => {
        self.index.insert(variant.id.clone(), self.variants.len());
        self.variants.push(variant);
      }
    }
  }

  /// Select a registered variant by id.
  pub fn select(&self, id: &str) -> Result<&Variant, VariantError> {
    self
      .index
      .get(id)
      .map(|&idx| &self.variants[idx])
      .ok_or_else(|| VariantError::UnknownVariant {
        id: id.to_string(),
        known: self.variants.iter().map(|v| v.id.clone()).collect(),
      })
  }

  /// Variants in registration order.
  pub fn variants(&self) -> impl Iterator<Item = &Variant> {
    self.variants.iter()
  }

  pub fn len(&self) -> usize {
    self.variants.len()
  }

  pub fn is_empty(&self) -> bool {
    self.variants.is_empty()
  }
}
