//! Test utilities for chisel-lib.
//!
//! Step commands run through the platform shell, so tests that need a
//! succeeding, failing or file-writing command get it from here.

/// A command that exits successfully.
pub fn ok_cmd() -> String {
  "exit 0".to_string()
}

/// A command that exits with a non-zero status.
pub fn fail_cmd() -> String {
  "exit 3".to_string()
}

/// A command that writes `content` to `filename` in the working directory.
#[cfg(unix)]
pub fn write_file_cmd(filename: &str, content: &str) -> String {
  format!("printf '%s' '{}' > '{}'", content, filename)
}

#[cfg(windows)]
pub fn write_file_cmd(filename: &str, content: &str) -> String {
  format!("Set-Content -NoNewline -Path '{}' -Value '{}'", filename, content)
}
