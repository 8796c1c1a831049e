//! Output formatting module
//!
//! Handles:
//! - Human-readable output for scan verdicts, events, and reports
//! - JSON output for machine consumption
//! - Quiet mode behavior (threats only)

use crate::models::{EventKind, ProcessVerdict, RiskLevel, ScanEvent, SignatureRecord};
use crate::report::ThreatReport;
use crate::session::PassSummary;
use anyhow::Result;

/// Format a scan event as human-readable text.
/// Used by both `monitor` stdout and `report --events` for consistent output.
pub fn format_event_human(event: &ScanEvent) -> String {
    let tag = match event.kind {
        EventKind::Info => "INFO",
        EventKind::Warning => "WARN",
        EventKind::Threat => "THREAT",
        EventKind::Error => "ERROR",
    };

    let mut line = format!(
        "[{}] {} {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
        tag,
        event.message
    );
    if let Some(threat) = &event.threat {
        line.push_str(&format!(
            "\n  File: {}\n  Risk: {} ({})",
            threat.detected_file, threat.risk_level, threat.confidence
        ));
    }
    line
}

/// Format a scan event as JSON string.
pub fn format_event_json(event: &ScanEvent) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

/// Format verdicts of one scan pass in human-readable format.
/// In quiet mode only flagged processes are printed.
pub fn format_pass_human(verdicts: &[ProcessVerdict], summary: &PassSummary, quiet: bool) {
    let flagged: Vec<&ProcessVerdict> = verdicts
        .iter()
        .filter(|v| v.aggregate_risk > RiskLevel::Safe)
        .collect();

    if !quiet {
        if verdicts.is_empty() {
            println!("No matching processes found.");
        }
        for verdict in verdicts {
            println!(
                "{} (PID {}): {}",
                verdict.process_name, verdict.pid, verdict.aggregate_risk
            );
            for result in &verdict.module_matches {
                match &result.signature {
                    Some(sig) => println!(
                        "  {} -> {} [{}] ({})",
                        result.observation.file_name, sig.display_name, sig.risk_level,
                        result.confidence
                    ),
                    None => println!("  {} -> clean", result.observation.file_name),
                }
            }
        }
    } else {
        for verdict in &flagged {
            for result in &verdict.module_matches {
                if let Some(sig) = &result.signature {
                    println!(
                        "{} (PID {}): {} [{}] in {}",
                        verdict.process_name,
                        verdict.pid,
                        sig.display_name,
                        sig.risk_level,
                        result.observation.file_name
                    );
                }
            }
        }
    }

    if !quiet {
        println!();
        println!("Scan Summary:");
        println!("  Processes scanned: {}", summary.processes_scanned);
        if summary.processes_skipped > 0 {
            println!("  Processes skipped: {}", summary.processes_skipped);
        }
        println!("  Threats found: {}", summary.threats_found);

        let duration_sec = summary.duration_ms as f64 / 1000.0;
        if duration_sec < 1.0 {
            println!("  Duration: {}ms", summary.duration_ms);
        } else {
            println!("  Duration: {:.2}s", duration_sec);
        }
    }
}

/// Format verdicts of one scan pass as pretty JSON
pub fn format_pass_json(verdicts: &[ProcessVerdict], summary: &PassSummary) -> Result<String> {
    let output = serde_json::json!({
        "verdicts": verdicts,
        "summary": summary,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format the signature list as a fixed-width table
pub fn format_signatures_human(records: &[SignatureRecord]) {
    if records.is_empty() {
        println!("No signatures in database.");
        return;
    }

    println!(
        "{:<20} {:<24} {:<11} {:<8} {:>5}  {}",
        "ID", "NAME", "RISK", "ACTIVE", "SEV", "PATTERNS"
    );
    for record in records {
        println!(
            "{:<20} {:<24} {:<11} {:<8} {:>5.1}  {}",
            record.id,
            record.display_name,
            record.risk_level.to_string(),
            if record.active { "yes" } else { "no" },
            record.severity_score,
            record.file_signatures.join(", ")
        );
    }
    println!();
    println!("{} signatures total.", records.len());
}

/// Format a report in human-readable format
pub fn format_report_human(report: &ThreatReport) {
    let summary = &report.summary;

    println!("Threat Report");
    match (report.period.start, report.period.end) {
        (Some(start), Some(end)) => println!("  Period: {} to {}", start, end),
        (Some(start), None) => println!("  Period: from {}", start),
        (None, Some(end)) => println!("  Period: through {}", end),
        (None, None) => println!("  Period: all time"),
    }
    println!();

    println!("Summary:");
    println!("  Total events: {}", summary.total_events);
    println!("  Threat detections: {}", summary.threat_events);
    println!("  Warnings: {}", summary.warning_events);
    println!("  Errors: {}", summary.error_events);

    if summary.unique_threats.is_empty() {
        println!("  No threats detected.");
    } else {
        println!(
            "  Unique threats: {}",
            summary.unique_threats.join(", ")
        );
        if let Some(most) = &summary.most_detected_threat {
            println!("  Most detected: {} ({} times)", most.name, most.count);
        }
    }

    println!();
    println!("Last 7 days:");
    for day in &summary.threat_trend {
        println!("  {}: {}", day.date, day.count);
    }

    if !report.threat_timeline.is_empty() {
        println!();
        println!("Threat timeline:");
        for entry in &report.threat_timeline {
            println!(
                "  [{}] {} [{}] in {} (PID {})",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.threat,
                entry.risk_level,
                entry.detected_file,
                entry.pid
            );
        }
    }
}
