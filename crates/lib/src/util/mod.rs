//! Shared utilities.
//!
//! Hashing for plan identity, plus test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
