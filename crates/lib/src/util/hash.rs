//! Content hashing for plan identity.
//!
//! A plan is hashed from its JSON serialization, so two invocations that
//! select the same variant, target and manifest content get the same id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A truncated lowercase hex SHA-256 digest, e.g. `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let digest = Sha256::digest(serialized.as_bytes());
    let full = hex::encode(digest);
    Ok(ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Serialize)]
  struct Sample {
    name: &'static str,
    n: u32,
  }

  impl Hashable for Sample {}

  #[test]
  fn hash_is_stable_and_truncated() {
    let a = Sample { name: "x", n: 1 }.compute_hash().unwrap();
    let b = Sample { name: "x", n: 1 }.compute_hash().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.0.len(), OBJ_HASH_PREFIX_LEN);
    assert!(a.0.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }

  #[test]
  fn different_content_different_hash() {
    let a = Sample { name: "x", n: 1 }.compute_hash().unwrap();
    let b = Sample { name: "x", n: 2 }.compute_hash().unwrap();
    assert_ne!(a, b);
  }
}
