//! Target versions and version predicates.
//!
//! A [`TargetVersion`] is a dotted sequence of numeric segments such as
//! `1.20.5`. Versions compare segment by segment as numbers, and when one
//! version is a prefix of the other the shorter one sorts first, so
//! `1.20 < 1.20.0 < 1.20.5 < 1.21`.
//!
//! A [`Predicate`] is one or more whitespace-separated clauses, all of which
//! must hold:
//!
//! ```
//! use chisel_lib::version::{TargetVersion, evaluate};
//!
//! let target: TargetVersion = "1.20.6".parse().unwrap();
//! assert!(evaluate(">=1.20.5 <1.21", &target).unwrap());
//! assert!(!evaluate("<1.20.5", &target).unwrap());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing versions and predicates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  /// A version had an empty or non-numeric segment.
  #[error("malformed version '{0}': segments must be non-empty and numeric")]
  MalformedVersion(String),

  /// A predicate was empty or had an operator with no version.
  #[error("malformed predicate '{0}'")]
  MalformedPredicate(String),
}

/// A dotted numeric version, e.g. `1.20.5`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetVersion {
  // Derived `Ord` on `Vec<u64>` is exactly numeric-segment order with
  // shorter-prefix-first tie breaking.
  segments: Vec<u64>,
}

impl TargetVersion {
  pub fn segments(&self) -> &[u64] {
    &self.segments
  }
}

impl FromStr for TargetVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(VersionError::MalformedVersion(s.to_string()));
    }

    let segments = trimmed
      .split('.')
      .map(|seg| {
        if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
          return Err(VersionError::MalformedVersion(s.to_string()));
        }
        seg.parse::<u64>().map_err(|_| VersionError::MalformedVersion(s.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { segments })
  }
}

impl TryFrom<String> for TargetVersion {
  type Error = VersionError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<TargetVersion> for String {
  fn from(value: TargetVersion) -> Self {
    value.to_string()
  }
}

impl fmt::Display for TargetVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for seg in &self.segments {
      if !first {
        f.write_str(".")?;
      }
      write!(f, "{}", seg)?;
      first = false;
    }
    Ok(())
  }
}

/// Comparison operator of a single predicate clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
  Ge,
  Gt,
  Le,
  Lt,
  Eq,
  Ne,
}

impl Comparator {
  // Longest operators first so `>=` is not read as `>`.
  const TOKENS: [(&'static str, Comparator); 7] = [
    (">=", Comparator::Ge),
    ("<=", Comparator::Le),
    ("==", Comparator::Eq),
    ("!=", Comparator::Ne),
    (">", Comparator::Gt),
    ("<", Comparator::Lt),
    ("=", Comparator::Eq),
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Comparator::Ge => ">=",
      Comparator::Gt => ">",
      Comparator::Le => "<=",
      Comparator::Lt => "<",
      Comparator::Eq => "=",
      Comparator::Ne => "!=",
    }
  }

  fn split_prefix(token: &str) -> (Comparator, &str) {
    for (prefix, cmp) in Self::TOKENS {
      if let Some(rest) = token.strip_prefix(prefix) {
        return (cmp, rest);
      }
    }
    (Comparator::Eq, token)
  }

  fn holds(self, lhs: &TargetVersion, rhs: &TargetVersion) -> bool {
    match self {
      Comparator::Ge => lhs >= rhs,
      Comparator::Gt => lhs > rhs,
      Comparator::Le => lhs <= rhs,
      Comparator::Lt => lhs < rhs,
      Comparator::Eq => lhs == rhs,
      Comparator::Ne => lhs != rhs,
    }
  }
}

/// A single `<op><version>` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
  pub op: Comparator,
  pub version: TargetVersion,
}

impl fmt::Display for Clause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.op.as_str(), self.version)
  }
}

/// A conjunction of version clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
  clauses: Vec<Clause>,
}

impl Predicate {
  pub fn clauses(&self) -> &[Clause] {
    &self.clauses
  }

  /// Returns true if every clause holds for `target`.
  pub fn matches(&self, target: &TargetVersion) -> bool {
    self.clauses.iter().all(|c| c.op.holds(target, &c.version))
  }
}

impl FromStr for Predicate {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut clauses = Vec::new();
    let mut tokens = s.split_whitespace();

    while let Some(token) = tokens.next() {
      let (op, rest) = Comparator::split_prefix(token);

      // Allow a space between operator and version: `>= 1.20.5`.
      let version_str = if rest.is_empty() {
        tokens
          .next()
          .ok_or_else(|| VersionError::MalformedPredicate(s.to_string()))?
      } else {
        rest
      };

      clauses.push(Clause {
        op,
        version: version_str.parse()?,
      });
    }

    if clauses.is_empty() {
      return Err(VersionError::MalformedPredicate(s.to_string()));
    }

    Ok(Self { clauses })
  }
}

impl fmt::Display for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
    f.write_str(&parts.join(" "))
  }
}

/// Evaluate a predicate string against a target version.
///
/// # Errors
///
/// `MalformedVersion` if any version in the predicate has a non-numeric
/// segment, `MalformedPredicate` if the predicate is empty or dangling.
pub fn evaluate(predicate: &str, target: &TargetVersion) -> Result<bool, VersionError> {
  let predicate: Predicate = predicate.parse()?;
  Ok(predicate.matches(target))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> TargetVersion {
    s.parse().unwrap()
  }

  #[test]
  fn numeric_not_lexical_order() {
    assert!(v("1.9") < v("1.10"));
    assert!(v("1.20.5") < v("1.21"));
    assert!(v("1.2.10") > v("1.2.9"));
  }

  #[test]
  fn shorter_prefix_sorts_first() {
    assert!(v("1.20") < v("1.20.5"));
    assert!(v("1.20") < v("1.20.0"));
    assert_ne!(v("1.20"), v("1.20.0"));
  }

  #[test]
  fn order_is_total_over_a_sample() {
    let mut versions = vec![v("1.21"), v("1.20.5"), v("1.8.9"), v("1.20"), v("1.20.4"), v("1")];
    versions.sort();
    let rendered: Vec<String> = versions.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["1", "1.8.9", "1.20", "1.20.4", "1.20.5", "1.21"]);
  }

  #[test]
  fn malformed_versions_rejected() {
    for bad in ["", "1..2", "1.20-pre1", "a.b", "1.20.", " "] {
      let err = bad.parse::<TargetVersion>().unwrap_err();
      assert!(matches!(err, VersionError::MalformedVersion(_)), "{bad:?} gave {err:?}");
    }
  }

  #[test]
  fn display_round_trips_text() {
    assert_eq!(v("1.20.5").to_string(), "1.20.5");
    assert_eq!(v("007.1").to_string(), "7.1");
  }

  #[test]
  fn operators() {
    let target = v("1.20.5");
    assert!(evaluate(">=1.20.5", &target).unwrap());
    assert!(!evaluate(">1.20.5", &target).unwrap());
    assert!(evaluate("<=1.20.5", &target).unwrap());
    assert!(evaluate("<1.21", &target).unwrap());
    assert!(evaluate("=1.20.5", &target).unwrap());
    assert!(evaluate("==1.20.5", &target).unwrap());
    assert!(evaluate("1.20.5", &target).unwrap());
    assert!(evaluate("!=1.20.4", &target).unwrap());
  }

  #[test]
  fn clauses_are_conjunctive() {
    assert!(evaluate(">=1.20 <1.21", &v("1.20.1")).unwrap());
    assert!(!evaluate(">=1.20 <1.21", &v("1.21")).unwrap());
  }

  #[test]
  fn operator_may_be_separated_by_space() {
    assert!(evaluate(">= 1.20.5", &v("1.21")).unwrap());
  }

  #[test]
  fn java_level_selection() {
    assert!(!evaluate(">=1.20.5", &v("1.20.1")).unwrap());
    assert!(evaluate(">=1.20.5", &v("1.20.6")).unwrap());
  }

  #[test]
  fn malformed_predicates() {
    assert!(matches!(
      evaluate("", &v("1.0")),
      Err(VersionError::MalformedPredicate(_))
    ));
    assert!(matches!(
      evaluate(">=", &v("1.0")),
      Err(VersionError::MalformedPredicate(_))
    ));
    assert!(matches!(
      evaluate(">=1.x", &v("1.0")),
      Err(VersionError::MalformedVersion(_))
    ));
  }

  #[test]
  fn predicate_display() {
    let p: Predicate = ">= 1.20  <1.21".parse().unwrap();
    assert_eq!(p.to_string(), ">=1.20 <1.21");
  }

  #[test]
  fn serde_uses_string_form() {
    let json = serde_json::to_string(&v("1.20.5")).unwrap();
    assert_eq!(json, "\"1.20.5\"");
    let back: TargetVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(back, v("1.20.5"));
    assert!(serde_json::from_str::<TargetVersion>("\"1.x\"").is_err());
  }
}
