//! Declarative project manifest.
//!
//! The manifest is a TOML file enumerating the project, its variants, their
//! feature flags, dependency coordinates, settings rules and build steps.
//! It is loaded once at startup and never mutated afterwards.

mod types;

pub use types::*;
