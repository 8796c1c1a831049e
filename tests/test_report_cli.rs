//! End-to-end tests for the `report` subcommand

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn modscan(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("modscan").unwrap();
    cmd.args(["--data-dir", data_dir.path().to_str().unwrap()]);
    cmd
}

#[test]
fn test_report_on_empty_log() {
    let dir = tempdir().unwrap();

    modscan(&dir)
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Threat Report"))
        .stdout(predicate::str::contains("No threats detected"));
}

#[test]
fn test_report_json_format_is_parseable() {
    let dir = tempdir().unwrap();

    let output = modscan(&dir)
        .args(["report", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["total_events"], 0);
    assert_eq!(report["summary"]["threat_trend"].as_array().unwrap().len(), 7);
}

#[test]
fn test_report_csv_format_has_header() {
    let dir = tempdir().unwrap();

    modscan(&dir)
        .args(["report", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Timestamp,Threat Name,Risk Level,Detected File,Process PID",
        ));
}

#[test]
fn test_report_output_writes_file() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("report.csv");

    modscan(&dir)
        .args(["report", "--format", "csv", "-o", out_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.starts_with("Timestamp,"));
}

#[test]
fn test_report_output_with_human_format_fails() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("report.txt");

    modscan(&dir)
        .args(["report", "-o", out_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--format json or csv"));
}

#[test]
fn test_report_invalid_date_rejected() {
    let dir = tempdir().unwrap();

    modscan(&dir)
        .args(["report", "--start", "2025-13-40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_report_includes_threats_from_event_log() {
    let dir = tempdir().unwrap();

    // Seed the event log the way a scan pass would have
    let event = serde_json::json!([{
        "id": "11111111-2222-3333-4444-555555555555",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "kind": "threat",
        "message": "Cheat client detected: Wurst Client in javaw.exe (pid 4242)",
        "threat": {
            "signature_id": "wurst",
            "threat_name": "Wurst Client",
            "risk_level": "dangerous",
            "confidence": "filename_match",
            "detected_file": "wurst_client.dll",
            "pid": 4242,
            "process_name": "javaw.exe"
        }
    }]);
    std::fs::write(
        dir.path().join("events.json"),
        serde_json::to_string_pretty(&event).unwrap(),
    )
    .unwrap();

    modscan(&dir)
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wurst Client"))
        .stdout(predicate::str::contains("Most detected: Wurst Client (1 times)"));

    modscan(&dir)
        .args(["report", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wurst_client.dll"))
        .stdout(predicate::str::contains("DANGEROUS"));
}
