//! Exit status and stream contract of the `schemex` binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn schemex(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schemex"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run schemex")
}

fn person_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("person.json"),
        r#"{"default": {"type": "object", "shape": {"name": {"type": "string"}}}}"#,
    )
    .unwrap();
    dir
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_success_prints_schema() {
    let dir = person_dir();
    let output = schemex(dir.path(), &["-i", "person.json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    assert!(stdout.ends_with("}\n"));
    let schema: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
    assert_eq!(stderr(&output), "");
}

#[test]
fn test_missing_export_exits_1() {
    let dir = person_dir();
    let output = schemex(dir.path(), &["-i", "person.json", "-s", "other"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = stderr(&output);
    assert!(stderr.starts_with("Error: Export 'other' not found in "), "got {}", stderr);
    assert!(stderr.contains("(available: default)"), "got {}", stderr);
}

#[test]
fn test_load_failure_exits_1() {
    let dir = TempDir::new().unwrap();
    let output = schemex(dir.path(), &["-i", "missing.json"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Error: Failed to read module "), "got {}", stderr(&output));
}

#[test]
fn test_conversion_failure_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("when.json"), r#"{"default": {"type": "date"}}"#).unwrap();
    let output = schemex(dir.path(), &["-i", "when.json"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).starts_with("Error: Conversion failed: "), "got {}", stderr(&output));
}

#[cfg(unix)]
#[test]
fn test_command_failure_exits_0() {
    let dir = person_dir();
    let output = schemex(
        dir.path(),
        &["-i", "person.json", "-o", "schema.json", "-x", "cat > /dev/null; exit 2"],
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(dir.path().join("schema.json").exists());
    let stderr = stderr(&output);
    assert!(stderr.contains("Extracted schema saved to "), "got {}", stderr);
    assert!(
        stderr.contains("Error executing command: Command failed with exit code 2"),
        "got {}",
        stderr
    );
}
