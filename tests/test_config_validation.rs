//! Tests for configuration file parsing and bounds validation via the CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_out_of_bounds_interval_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
[monitor]
scan_interval = 0.05
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args([
        "--data-dir",
        dir.path().to_str().unwrap(),
        "scan",
        "--config",
        config_path.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("scan_interval"));
}

#[test]
fn test_oversized_log_cap_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
[monitor]
max_log_entries = 500000
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args([
        "--data-dir",
        dir.path().to_str().unwrap(),
        "scan",
        "--config",
        config_path.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("max_log_entries"));
}

#[test]
fn test_malformed_toml_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "[monitor\nscan_interval = 5.0").unwrap();

    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args([
        "--data-dir",
        dir.path().to_str().unwrap(),
        "scan",
        "--config",
        config_path.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid configuration file"));
}

#[test]
fn test_missing_config_file_rejected() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args([
        "--data-dir",
        dir.path().to_str().unwrap(),
        "scan",
        "--config",
        "/nonexistent/config.toml",
    ])
    .assert()
    .failure();
}

#[test]
fn test_cli_interval_out_of_bounds_rejected() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args([
        "--data-dir",
        dir.path().to_str().unwrap(),
        "monitor",
        "--interval",
        "301",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("between"));
}
