//! Data models module
//!
//! Defines core data structures:
//! - SignatureRecord: identifying features and risk of a known cheat client
//! - ModuleObservation: one enumerated module as reported by the OS
//! - MatchResult / ProcessVerdict: classification output
//! - ScanEvent: persisted event log entry

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ordered risk classification. Ordering matters: process verdicts take the
/// maximum risk level across all matched modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Dangerous,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Safe => write!(f, "SAFE"),
            RiskLevel::Suspicious => write!(f, "SUSPICIOUS"),
            RiskLevel::Dangerous => write!(f, "DANGEROUS"),
        }
    }
}

/// Classification tag for a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Game,
    Utility,
    Hack,
    Unknown,
}

/// A record describing the identifying features (filename patterns, content
/// hashes) of a known tool/client and its assigned risk.
///
/// Invariants, enforced by the signature store:
/// - `id` is unique across the store
/// - at least one of `file_signatures` / `content_hashes` is non-empty
/// - `severity_score` lies within 0.0..=10.0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Unique stable identifier
    pub id: String,
    /// Human-readable client/tool name
    pub display_name: String,
    /// Case-insensitive substring patterns matched against module file names
    pub file_signatures: Vec<String>,
    /// Exact SHA-256 content digests (lowercase hex) for authoritative matches
    #[serde(default)]
    pub content_hashes: Vec<String>,
    /// Assigned risk when this signature matches
    pub risk_level: RiskLevel,
    /// Classification tag
    pub category: Category,
    /// Inactive signatures are never matched
    pub active: bool,
    /// 0.0-10.0, used for tie-breaking and reporting only
    pub severity_score: f64,
    /// Timestamp of last edit
    pub last_updated: DateTime<Utc>,
    /// Free-form description of the client
    #[serde(default)]
    pub description: String,
    /// Date the client was first observed in the wild, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<NaiveDate>,
}

impl SignatureRecord {
    /// True if the record carries at least one matchable feature
    pub fn has_matchable_feature(&self) -> bool {
        !self.file_signatures.is_empty() || !self.content_hashes.is_empty()
    }
}

/// Partial field update for `SignatureStore::update`. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct SignatureUpdate {
    pub display_name: Option<String>,
    pub file_signatures: Option<Vec<String>>,
    pub content_hashes: Option<Vec<String>>,
    pub risk_level: Option<RiskLevel>,
    pub category: Option<Category>,
    pub severity_score: Option<f64>,
    pub description: Option<String>,
}

/// One module (DLL/executable) reported as loaded by a running process.
/// Supplied externally per scan by a `ModuleEnumerator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleObservation {
    /// Full file-system path as reported by the OS
    pub path: PathBuf,
    /// Final path component, lowercased for matching
    pub file_name: String,
    /// SHA-256 digest of the module contents, if the caller computed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// When the OS reported the module as loaded
    pub load_timestamp: DateTime<Utc>,
}

impl ModuleObservation {
    /// Build an observation from a path, deriving the lowercased file name
    pub fn from_path(path: PathBuf, content_hash: Option<String>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            content_hash,
            load_timestamp: Utc::now(),
        }
    }
}

/// How a module was matched against the signature store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// The observation's content hash equals a signature's content hash.
    /// Authoritative and unambiguous.
    ExactHash,
    /// A filename pattern matched; the hash did not match or was absent
    FilenameMatch,
    /// No active signature matched; treated as safe
    None,
}

impl std::fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchConfidence::ExactHash => write!(f, "exact hash"),
            MatchConfidence::FilenameMatch => write!(f, "filename match"),
            MatchConfidence::None => write!(f, "no match"),
        }
    }
}

/// Summary of the signature a module matched, embedded in results and events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedSignature {
    pub id: String,
    pub display_name: String,
    pub risk_level: RiskLevel,
    pub category: Category,
    pub severity_score: f64,
}

impl From<&SignatureRecord> for MatchedSignature {
    fn from(record: &SignatureRecord) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            risk_level: record.risk_level,
            category: record.category,
            severity_score: record.severity_score,
        }
    }
}

/// Result of classifying one module against a store snapshot.
///
/// Invariant: `signature` is `Some` exactly when `confidence` is not `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub observation: ModuleObservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<MatchedSignature>,
    pub confidence: MatchConfidence,
}

impl MatchResult {
    /// Risk contributed by this match: the matched signature's level, or
    /// Safe when nothing matched
    pub fn risk(&self) -> RiskLevel {
        match &self.signature {
            Some(sig) if self.confidence != MatchConfidence::None => sig.risk_level,
            _ => RiskLevel::Safe,
        }
    }
}

/// A process of interest as reported by the enumeration capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// Aggregated risk conclusion for one process after matching all its modules.
/// Created fresh each pass and never mutated; the next pass supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVerdict {
    pub pid: u32,
    pub process_name: String,
    /// Match results in scan order
    pub module_matches: Vec<MatchResult>,
    /// max(risk) across matches with confidence != None; Safe if no matches
    pub aggregate_risk: RiskLevel,
}

/// Event log entry categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Warning,
    Threat,
    Error,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Info => write!(f, "info"),
            EventKind::Warning => write!(f, "warning"),
            EventKind::Threat => write!(f, "threat"),
            EventKind::Error => write!(f, "error"),
        }
    }
}

/// Structured detail attached to a `Threat` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatDetail {
    /// Id of the matched signature
    pub signature_id: String,
    /// Display name of the matched client
    pub threat_name: String,
    pub risk_level: RiskLevel,
    pub confidence: MatchConfidence,
    /// File name of the module that triggered the match
    pub detected_file: String,
    pub pid: u32,
    pub process_name: String,
}

/// Persisted log entry. The log is a bounded ring: oldest entries are
/// evicted once the configured maximum count is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<ThreatDetail>,
}

impl ScanEvent {
    /// Build an event with a fresh id and current timestamp
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            threat: None,
        }
    }

    /// Build a threat event carrying structured detail
    pub fn threat(message: impl Into<String>, detail: ThreatDetail) -> Self {
        let mut event = Self::new(EventKind::Threat, message);
        event.threat = Some(detail);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Safe < RiskLevel::Suspicious);
        assert!(RiskLevel::Suspicious < RiskLevel::Dangerous);
        assert_eq!(
            RiskLevel::Dangerous,
            RiskLevel::Safe.max(RiskLevel::Dangerous)
        );
    }

    #[test]
    fn test_observation_derives_lowercased_file_name() {
        let obs = ModuleObservation::from_path(PathBuf::from("C:/Game/Wurst_Client.DLL"), None);
        assert_eq!(obs.file_name, "wurst_client.dll");
    }

    #[test]
    fn test_observation_with_no_file_name_component() {
        let obs = ModuleObservation::from_path(PathBuf::from("/"), None);
        assert!(obs.file_name.is_empty());
    }

    #[test]
    fn test_match_result_risk_defaults_to_safe() {
        let result = MatchResult {
            observation: ModuleObservation::from_path(PathBuf::from("kernel32.dll"), None),
            signature: None,
            confidence: MatchConfidence::None,
        };
        assert_eq!(result.risk(), RiskLevel::Safe);
    }

    #[test]
    fn test_event_serialization_omits_empty_threat() {
        let event = ScanEvent::new(EventKind::Info, "pass complete");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("threat"));
        assert!(json.contains("\"kind\":\"info\""));
    }
}
