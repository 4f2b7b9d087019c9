//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `glucast` binary to verify that
//! argument parsing, help text, and error handling work end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("glucast").unwrap()
}

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("cv"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("glucast"));
}

#[test]
fn predict_no_config_prints_template() {
    cmd()
        .arg("predict")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"train_data\""))
        .stdout(predicate::str::contains("\"base_models\""))
        .stdout(predicate::str::contains("\"gbdt_xgb\""))
        .stderr(predicate::str::contains("No config file provided"));
}

#[test]
fn predict_nonexistent_config_errors() {
    cmd()
        .args(["predict", "/nonexistent/config.json"])
        .assert()
        .failure();
}

#[test]
fn cv_requires_config() {
    cmd().arg("cv").assert().failure();
}

#[test]
fn predict_rejects_missing_data_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        r#"{"train_data": "/nonexistent/train.csv", "test_data": "/nonexistent/test.csv"}"#,
    )
    .unwrap();

    cmd()
        .arg("predict")
        .arg(&config)
        .assert()
        .failure();
}
