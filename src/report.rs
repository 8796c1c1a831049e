//! Threat report generation and export
//!
//! Builds a serializable report from the event log: summary counts, unique
//! threats, detection trend, and the full threat timeline. JSON is the
//! primary export; CSV is a restriction of the timeline to fixed columns.

use crate::models::{EventKind, ScanEvent};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reporting period bounds (inclusive, by calendar date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// Inclusive start date, or None for all time
    pub start: Option<NaiveDate>,
    /// Inclusive end date, or None for all time
    pub end: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
}

/// Aggregated counters over the filtered events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_events: usize,
    pub threat_events: usize,
    pub warning_events: usize,
    pub info_events: usize,
    pub error_events: usize,
    /// Distinct threat names observed, sorted
    pub unique_threats: Vec<String>,
    /// Most frequently matched signature, if any threats occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_detected_threat: Option<ThreatCount>,
    /// Threat counts for the last 7 calendar days (oldest first)
    pub threat_trend: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// One row of the threat timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub threat: String,
    pub risk_level: String,
    pub detected_file: String,
    pub pid: u32,
}

/// One row of the system event list (non-threat happenings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEventEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
}

/// Complete exportable report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatReport {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    /// Threat event counts per signature name
    pub threats_by_type: BTreeMap<String, usize>,
    /// Threat event counts per calendar day
    pub threats_by_day: BTreeMap<NaiveDate, usize>,
    /// Every threat event in the period, oldest first
    pub threat_timeline: Vec<TimelineEntry>,
    /// Info/warning events in the period, oldest first
    pub system_events: Vec<SystemEventEntry>,
}

/// Build a report from events (oldest first), optionally restricted to an
/// inclusive date range.
pub fn generate(
    events: &[ScanEvent],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ThreatReport {
    let in_period = |event: &ScanEvent| {
        let date = event.timestamp.date_naive();
        start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
    };

    let mut summary = ReportSummary {
        total_events: 0,
        threat_events: 0,
        warning_events: 0,
        info_events: 0,
        error_events: 0,
        unique_threats: Vec::new(),
        most_detected_threat: None,
        threat_trend: Vec::new(),
    };
    let mut threats_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut threats_by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut threat_timeline = Vec::new();
    let mut system_events = Vec::new();

    for event in events.iter().filter(|e| in_period(e)) {
        summary.total_events += 1;
        match event.kind {
            EventKind::Threat => {
                summary.threat_events += 1;
                let (name, risk, file, pid) = match &event.threat {
                    Some(detail) => (
                        detail.threat_name.clone(),
                        detail.risk_level.to_string(),
                        detail.detected_file.clone(),
                        detail.pid,
                    ),
                    // Threat events always carry detail in practice; keep
                    // the report robust against hand-edited logs
                    None => (event.message.clone(), "UNKNOWN".to_string(), String::new(), 0),
                };

                *threats_by_type.entry(name.clone()).or_insert(0) += 1;
                *threats_by_day
                    .entry(event.timestamp.date_naive())
                    .or_insert(0) += 1;
                threat_timeline.push(TimelineEntry {
                    timestamp: event.timestamp,
                    threat: name,
                    risk_level: risk,
                    detected_file: file,
                    pid,
                });
            }
            EventKind::Warning => summary.warning_events += 1,
            EventKind::Info => summary.info_events += 1,
            EventKind::Error => summary.error_events += 1,
        }

        if matches!(event.kind, EventKind::Info | EventKind::Warning) {
            system_events.push(SystemEventEntry {
                timestamp: event.timestamp,
                kind: event.kind,
                message: event.message.clone(),
            });
        }
    }

    summary.unique_threats = threats_by_type.keys().cloned().collect();
    summary.most_detected_threat = threats_by_type
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, count)| ThreatCount {
            name: name.clone(),
            count: *count,
        });

    // Trend: the 7 calendar days ending today, zero-filled
    let today = Utc::now().date_naive();
    summary.threat_trend = (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyCount {
                date,
                count: threats_by_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect();

    ThreatReport {
        period: ReportPeriod {
            start,
            end,
            generated_at: Utc::now(),
        },
        summary,
        threats_by_type,
        threats_by_day,
        threat_timeline,
        system_events,
    }
}

impl ThreatReport {
    /// Pretty JSON export
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// CSV export of the threat timeline
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Timestamp,Threat Name,Risk Level,Detected File,Process PID\n");
        for entry in &self.threat_timeline {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                entry.timestamp.to_rfc3339(),
                csv_escape(&entry.threat),
                csv_escape(&entry.risk_level),
                csv_escape(&entry.detected_file),
                entry.pid
            ));
        }
        out
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or newline
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
