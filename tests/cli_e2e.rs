//! End-to-end CLI tests for the photosync binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Synchronize a remote photo library",
        ))
        .stdout(predicate::str::contains("--resync"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("photosync"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that a malformed --since date is rejected before anything runs.
#[test]
fn test_binary_rejects_malformed_since_date() {
    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.args(["--since", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--since"));
}

/// Test that --import-token is a standalone operation: it creates the
/// state database in the root directory and exits successfully without
/// contacting the remote service.
#[test]
fn test_binary_import_token_creates_state_store() {
    let root = TempDir::new().expect("failed to create temp dir");
    let token_file = root.path().join("token.txt");
    std::fs::write(&token_file, "ya29.imported\n").expect("should write token file");

    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--dir")
        .arg(root.path())
        .arg("--import-token")
        .arg(&token_file)
        .assert()
        .success();

    assert!(
        root.path().join("sync.db").exists(),
        "Token import should initialize the state database"
    );
}

/// Test that importing from a missing file fails with a useful message.
#[test]
fn test_binary_import_token_missing_file_errors() {
    let root = TempDir::new().expect("failed to create temp dir");

    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--dir")
        .arg(root.path())
        .arg("--import-token")
        .arg(root.path().join("no-such-file.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-file.txt"));
}

/// Test that a sync without any credential fails rather than silently
/// doing nothing.
#[test]
fn test_binary_sync_without_credential_fails() {
    let root = TempDir::new().expect("failed to create temp dir");

    let mut cmd = Command::cargo_bin("photosync").unwrap();
    cmd.arg("--dir")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("credential"));
}
