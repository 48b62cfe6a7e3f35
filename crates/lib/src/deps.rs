//! Dependency specifications and their composition.
//!
//! A [`DependencySet`] holds at most one [`DependencySpec`] per library, where
//! a library is `group:artifact[:classifier]` and the version is data.
//! [`compose`] merges the common set with a variant-specific set: variant
//! entries win over common entries for the same library, whatever either
//! version is, and everything else is unioned.
//!
//! # Scope compatibility
//!
//! When a library appears in both sets the two scopes must be compatible
//! unless the variant entry is marked as an explicit override:
//!
//! | common \ variant | compile | runtime | dev-only |
//! |------------------|---------|---------|----------|
//! | compile          | yes     | yes     | no       |
//! | runtime          | yes     | yes     | no       |
//! | dev-only         | no      | no      | yes      |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
  #[error("malformed coordinate '{0}': expected group:artifact[:version[:classifier]]")]
  MalformedCoordinate(String),

  #[error("dependency '{coordinate}' declared twice in the {set} set")]
  DuplicateCoordinate { coordinate: String, set: String },

  #[error(
    "conflicting scope for '{coordinate}': common declares {common}, variant declares {variant} \
     (mark the variant entry as an explicit override to replace it)"
  )]
  ConflictingScope {
    coordinate: String,
    common: Scope,
    variant: Scope,
  },
}

/// Where a dependency is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
  #[default]
  Compile,
  Runtime,
  DevOnly,
}

impl Scope {
  pub fn as_str(self) -> &'static str {
    match self {
      Scope::Compile => "compile",
      Scope::Runtime => "runtime",
      Scope::DevOnly => "dev-only",
    }
  }

  pub fn is_compatible_with(self, other: Scope) -> bool {
    match (self, other) {
      (Scope::DevOnly, Scope::DevOnly) => true,
      (Scope::DevOnly, _) | (_, Scope::DevOnly) => false,
      _ => true,
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A validated Maven-style coordinate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate(String);

impl Coordinate {
  pub fn parse(s: &str) -> Result<Self, DependencyError> {
    let parts: Vec<&str> = s.split(':').collect();
    let valid = (2..=4).contains(&parts.len())
      && parts
        .iter()
        .all(|p| !p.is_empty() && !p.chars().any(char::is_whitespace));

    if !valid {
      return Err(DependencyError::MalformedCoordinate(s.to_string()));
    }
    Ok(Self(s.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  fn part(&self, idx: usize) -> Option<&str> {
    self.0.split(':').nth(idx)
  }

  pub fn group(&self) -> &str {
    self.part(0).unwrap_or_default()
  }

  pub fn artifact(&self) -> &str {
    self.part(1).unwrap_or_default()
  }

  pub fn version(&self) -> Option<&str> {
    self.part(2)
  }

  pub fn classifier(&self) -> Option<&str> {
    self.part(3)
  }

  /// The library this coordinate names: `group:artifact[:classifier]`.
  pub fn library(&self) -> String {
    match self.classifier() {
      Some(classifier) => format!("{}:{}:{}", self.group(), self.artifact(), classifier),
      None => format!("{}:{}", self.group(), self.artifact()),
    }
  }
}

impl TryFrom<String> for Coordinate {
  type Error = DependencyError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Coordinate::parse(&value)
  }
}

impl From<Coordinate> for String {
  fn from(value: Coordinate) -> Self {
    value.0
  }
}

impl fmt::Display for Coordinate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A single dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
  pub coordinate: Coordinate,
  pub scope: Scope,
  /// Whether the dependency's own dependencies are pulled in.
  pub transitive: bool,
  /// Replace a common entry even when scopes conflict.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub explicit_override: bool,
}

impl DependencySpec {
  pub fn new(coordinate: Coordinate, scope: Scope) -> Self {
    Self {
      coordinate,
      scope,
      transitive: true,
      explicit_override: false,
    }
  }
}

/// Library-keyed dependency collection, iterated in library order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DependencySpec>", into = "Vec<DependencySpec>")]
pub struct DependencySet {
  entries: BTreeMap<String, DependencySpec>,
}

impl DependencySet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a spec, replacing and returning any entry for the same library.
  pub fn insert(&mut self, spec: DependencySpec) -> Option<DependencySpec> {
    self.entries.insert(spec.coordinate.library(), spec)
  }

  /// Insert a spec, failing if its library is already present.
  pub fn try_insert(&mut self, spec: DependencySpec, set: &str) -> Result<(), DependencyError> {
    if let Some(existing) = self.get(&spec.coordinate) {
      return Err(DependencyError::DuplicateCoordinate {
        coordinate: existing.coordinate.to_string(),
        set: set.to_string(),
      });
    }
    self.insert(spec);
    Ok(())
  }

  /// The entry for the library `coordinate` names, at any version.
  pub fn get(&self, coordinate: &Coordinate) -> Option<&DependencySpec> {
    self.entries.get(&coordinate.library())
  }

  /// Whether exactly `coordinate`, version included, is in the set.
  pub fn contains(&self, coordinate: &Coordinate) -> bool {
    self.get(coordinate).is_some_and(|spec| &spec.coordinate == coordinate)
  }

  pub fn iter(&self) -> impl Iterator<Item = &DependencySpec> {
    self.entries.values()
  }

  /// Entries with the given scope.
  pub fn with_scope(&self, scope: Scope) -> impl Iterator<Item = &DependencySpec> {
    self.iter().filter(move |d| d.scope == scope)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Later specs replace earlier ones for the same library.
impl FromIterator<DependencySpec> for DependencySet {
  fn from_iter<T: IntoIterator<Item = DependencySpec>>(iter: T) -> Self {
    let mut set = DependencySet::new();
    for spec in iter {
      set.insert(spec);
    }
    set
  }
}

/// A serialized set must name each library once.
impl TryFrom<Vec<DependencySpec>> for DependencySet {
  type Error = DependencyError;

  fn try_from(value: Vec<DependencySpec>) -> Result<Self, Self::Error> {
    let mut set = DependencySet::new();
    for spec in value {
      set.try_insert(spec, "serialized")?;
    }
    Ok(set)
  }
}

impl From<DependencySet> for Vec<DependencySpec> {
  fn from(value: DependencySet) -> Self {
    value.entries.into_values().collect()
  }
}

/// Merge `common` with `variant_specific`.
///
/// # Errors
///
/// `ConflictingScope` when a library is in both sets with incompatible
/// scopes and the variant entry is not an explicit override.
pub fn compose(common: &DependencySet, variant_specific: &DependencySet) -> Result<DependencySet, DependencyError> {
  let mut merged = common.clone();

  for spec in variant_specific.iter() {
    if let Some(existing) = common.get(&spec.coordinate) {
      if !spec.explicit_override && !existing.scope.is_compatible_with(spec.scope) {
        return Err(DependencyError::ConflictingScope {
          coordinate: spec.coordinate.to_string(),
          common: existing.scope,
          variant: spec.scope,
        });
      }
      debug!(
        coordinate = %spec.coordinate,
        replaces = %existing.coordinate,
        common = %existing.scope,
        variant = %spec.scope,
        "variant entry overrides common dependency"
      );
    }
    merged.insert(spec.clone());
  }

  info!(
    common = common.len(),
    variant = variant_specific.len(),
    resolved = merged.len(),
    "composed dependency sets"
  );

  Ok(merged)
}
