//! Integration tests for top-level CLI behavior.

use std::process::Command;

fn run_tapedeck(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_tapedeck");
    Command::new(bin).args(args).output().expect("failed to run tapedeck binary")
}

const METADATA: &str = r#"{
  "reports_number": 2,
  "mismatches": 2,
  "started": "2025-03-15T14:30:00Z",
  "finished": "2025-03-15T14:30:04.250Z",
  "total_played": 12,
  "mode": "observe"
}"#;

#[test]
fn summary_prints_counts_from_metadata() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("metadata.json"), METADATA).unwrap();

    let output = run_tapedeck(&["summary", dir.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("recorded in 'observe' mode"));
    assert!(stdout.contains("Total requests played: 12"));
    assert!(stdout.contains("Successful: 10"));
    assert!(stdout.contains("Reports generated: 2"));
    assert!(stdout.contains("Elapsed time: 4.250 sec"));
}

#[test]
fn summary_without_metadata_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_tapedeck(&["summary", dir.path().to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("metadata.json"));
}

#[test]
fn run_without_mode_reports_the_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tapedeck"))
        .arg("run")
        .current_dir(dir.path())
        .env_remove("TAPEDECK_MODE")
        .env("TAPEDECK_TARGET_URL", "http://localhost:1")
        .output()
        .expect("failed to run tapedeck binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("TAPEDECK_MODE"));
}

#[test]
fn unknown_subcommand_shows_error() {
    let output = run_tapedeck(&["rewind"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn help_lists_subcommands() {
    let output = run_tapedeck(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("run"));
    assert!(stdout.contains("summary"));
}
