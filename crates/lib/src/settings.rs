//! Settings derived from version rules.
//!
//! A manifest declares default settings plus an ordered list of rules, each
//! guarded by a version predicate. Rules are applied in declaration order and
//! a later matching rule overrides keys set by an earlier one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::version::{Predicate, TargetVersion, VersionError};

/// Resolved settings, keyed by name.
pub type Settings = BTreeMap<String, String>;

/// A predicate-guarded set of setting overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsRule {
  /// Version predicate, e.g. `>=1.20.5`.
  pub when: String,
  /// Settings applied when the predicate holds.
  #[serde(default)]
  pub set: BTreeMap<String, String>,
}

/// Derive settings for `target` from `defaults` and `rules`.
///
/// Every rule's predicate is parsed, including rules that end up not
/// matching, so a malformed rule fails regardless of the target.
pub fn derive_settings(
  defaults: &BTreeMap<String, String>,
  rules: &[SettingsRule],
  target: &TargetVersion,
) -> Result<Settings, VersionError> {
  let mut settings = defaults.clone();

  for (idx, rule) in rules.iter().enumerate() {
    let predicate: Predicate = rule.when.parse()?;
    let matched = predicate.matches(target);
    debug!(rule = idx, when = %predicate, matched, "evaluated settings rule");

    if matched {
      for (key, value) in &rule.set {
        settings.insert(key.clone(), value.clone());
      }
    }
  }

  Ok(settings)
}
