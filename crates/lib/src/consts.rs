//! Crate-wide constants.

/// Manifest file name looked up when no path is given.
pub const DEFAULT_MANIFEST: &str = "chisel.toml";

/// Environment variable that overrides the artifact directory.
pub const ARTIFACT_DIR_ENV: &str = "CHISEL_ARTIFACT_DIR";

/// Artifact directory relative to the project directory.
pub const DEFAULT_ARTIFACT_DIR: &str = "build/artifacts";

/// Directory (inside the artifact directory) holding per-output lock files.
pub const LOCKS_DIR: &str = ".locks";

/// Length of the truncated plan hash.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;
