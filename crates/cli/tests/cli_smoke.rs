//! CLI smoke tests for chisel.
//!
//! These tests verify that all CLI commands run without panicking and
//! return appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the chisel binary.
fn chisel_cmd() -> Command {
  cargo_bin_cmd!("chisel")
}

/// Create a temp directory with a manifest.
fn temp_manifest(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("chisel.toml"), content).unwrap();
  temp
}

const MANIFEST: &str = r#"
[project]
id = "locomotion"
version = "1.0.0"
minecraft = "1.20.1"

[properties]
fabric_loader = "0.15.11"

[settings]
java = "17"

[[rules]]
when = ">=1.20.5"
set = { java = "21" }

[[dependencies]]
coordinate = "com.mojang:minecraft:${minecraft}"

[[dependencies]]
coordinate = "org.junit:junit-bom:5.10.0"
scope = "dev-only"

[[variants]]
id = "fabric"
flags = ["datagen"]

[[variants.dependencies]]
coordinate = "net.fabricmc:fabric-loader:${fabric_loader}"

[[variants]]
id = "forge"

[[variants.dependencies]]
coordinate = "net.minecraftforge:forge:${minecraft}-47.2.0"

[[steps]]
name = "compile"
outputs = ["${archive.name}-dev.jar"]
run = "exit 0"

[[steps]]
name = "remap"
inputs = ["${archive.name}-dev.jar"]
outputs = ["${archive.name}-${archive.version}.jar"]
run = "exit 0"
"#;

/// The compile step fails; remap depends on it.
const FAILING_MANIFEST: &str = r#"
[project]
id = "locomotion"
version = "1.0.0"
minecraft = "1.20.1"

[[variants]]
id = "fabric"

[[steps]]
name = "compile"
outputs = ["dev.jar"]
run = "exit 3"

[[steps]]
name = "remap"
inputs = ["dev.jar"]
run = "exit 0"
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  chisel_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  chisel_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("chisel"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["plan", "deps", "eval", "variants", "run"] {
    chisel_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// plan
// =============================================================================

#[test]
fn plan_defaults_to_first_variant() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("fabric"))
    .stdout(predicate::str::contains("java=17"))
    .stdout(predicate::str::contains("2 in 2 wave(s)"));
}

#[test]
fn plan_json_has_id_and_steps() {
  let temp = temp_manifest(MANIFEST);

  let output = chisel_cmd()
    .arg("plan")
    .arg("--manifest")
    .arg(temp.path().join("chisel.toml"))
    .arg("--variant")
    .arg("forge")
    .arg("--minecraft")
    .arg("1.21")
    .arg("-o")
    .arg("json")
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
  assert_eq!(json["id"].as_str().unwrap().len(), 20);
  assert_eq!(json["variant"]["id"], "forge");
  assert_eq!(json["minecraft"], "1.21");
  assert_eq!(json["settings"]["java"], "21");
  assert_eq!(json["steps"][0]["name"], "compile");
  assert_eq!(json["steps"][1]["depends_on"][0], "compile");
}

#[test]
fn plan_unknown_variant_fails() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("plan")
    .arg("--variant")
    .arg("quilt")
    .assert()
    .failure()
    .stderr(predicate::str::contains("quilt"));
}

#[test]
fn plan_malformed_version_fails() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("plan")
    .arg("--minecraft")
    .arg("1.x")
    .assert()
    .failure();
}

#[test]
fn plan_nonexistent_manifest_fails() {
  chisel_cmd()
    .arg("plan")
    .arg("--manifest")
    .arg("/nonexistent/path/chisel.toml")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to plan"));
}

#[test]
fn invalid_toml_fails() {
  let temp = temp_manifest("this is not toml [[[");

  chisel_cmd()
    .current_dir(temp.path())
    .arg("plan")
    .assert()
    .failure();
}

// =============================================================================
// deps
// =============================================================================

#[test]
fn deps_lists_composed_set() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("deps")
    .assert()
    .success()
    .stdout(predicate::str::contains("com.mojang:minecraft:1.20.1"))
    .stdout(predicate::str::contains("net.fabricmc:fabric-loader:0.15.11"));
}

#[test]
fn deps_scope_filter() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("deps")
    .arg("--scope")
    .arg("dev-only")
    .assert()
    .success()
    .stdout(predicate::str::contains("junit-bom"))
    .stdout(predicate::str::contains("minecraft").not());
}

// =============================================================================
// eval
// =============================================================================

#[test]
fn eval_with_explicit_target() {
  chisel_cmd()
    .arg("eval")
    .arg(">=1.20.5")
    .arg("--minecraft")
    .arg("1.21")
    .assert()
    .success()
    .stdout(predicate::str::diff("true\n"));
}

#[test]
fn eval_uses_manifest_target() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("eval")
    .arg(">=1.20.5")
    .assert()
    .success()
    .stdout(predicate::str::diff("false\n"));
}

#[test]
fn eval_malformed_predicate_fails() {
  chisel_cmd()
    .arg("eval")
    .arg("~>1.20")
    .arg("--minecraft")
    .arg("1.21")
    .assert()
    .failure();
}

// =============================================================================
// variants
// =============================================================================

#[test]
fn variants_lists_declared() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("variants")
    .assert()
    .success()
    .stdout(predicate::str::contains("fabric (default) [datagen]"))
    .stdout(predicate::str::contains("forge"))
    .stdout(predicate::str::contains("2 variant(s) total"));
}

// =============================================================================
// run
// =============================================================================

#[test]
fn run_succeeds() {
  let temp = temp_manifest(MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("run")
    .env("CHISEL_ARTIFACT_DIR", temp.path().join("out"))
    .assert()
    .success()
    .stdout(predicate::str::contains("2 succeeded, 0 failed, 0 skipped"));

  assert!(temp.path().join("out").join(".locks").exists());
}

#[test]
fn run_failure_skips_dependents() {
  let temp = temp_manifest(FAILING_MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("run")
    .arg("--jobs")
    .arg("2")
    .assert()
    .failure()
    .stdout(predicate::str::contains("0 succeeded, 1 failed, 1 skipped"))
    .stderr(predicate::str::contains("remap skipped"));
}

#[cfg(unix)]
#[test]
fn run_with_shell_override() {
  let temp = temp_manifest(
    r#"
[project]
id = "locomotion"
version = "1.0.0"
minecraft = "1.20.1"

[[variants]]
id = "fabric"

[[steps]]
name = "which-shell"
run = "echo $0 > shell.txt"
"#,
  );

  chisel_cmd()
    .current_dir(temp.path())
    .arg("run")
    .arg("--shell")
    .arg("sh")
    .assert()
    .success()
    .stdout(predicate::str::contains("1 succeeded, 0 failed, 0 skipped"));

  let shell = std::fs::read_to_string(temp.path().join("shell.txt")).unwrap();
  assert_eq!(shell.trim(), "sh");
}

#[test]
fn run_dry_run_executes_nothing() {
  let temp = temp_manifest(FAILING_MANIFEST);

  chisel_cmd()
    .current_dir(temp.path())
    .arg("run")
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("(dry run)"));
}
