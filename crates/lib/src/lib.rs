//! chisel-lib: Core types and logic for chisel
//!
//! This crate plans builds for one variant of a multi-loader, multi-version
//! project:
//! - `variant`: the registry of platform variants and their constants
//! - `version`: target versions and version predicates
//! - `settings`: settings derived from predicate rules
//! - `deps`: dependency sets and their composition
//! - `graph`: the build-step DAG and its deterministic ordering
//! - `plan`: the planner tying the above together
//! - `execute`: running a plan through an external step executor

pub mod artifact_lock;
pub mod config;
pub mod consts;
pub mod deps;
pub mod execute;
pub mod graph;
pub mod interpolate;
pub mod manifest;
pub mod plan;
pub mod settings;
pub mod util;
pub mod variant;
pub mod version;
