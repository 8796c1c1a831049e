//! Classification engine
//!
//! Deterministic matching of module observations against a signature store
//! snapshot. Matching precedence:
//! 1. exact content hash (authoritative, must be unambiguous)
//! 2. case-insensitive filename substring, highest severity wins,
//!    ties broken by lexicographically smallest id
//! 3. no match (a normal outcome, never an error)
//!
//! The engine holds no state between calls: `classify_module` is a pure
//! function of (observation, snapshot), which keeps it testable with fakes
//! and safely parallelizable across modules and processes.

use crate::models::{
    MatchConfidence, MatchResult, ModuleObservation, ProcessInfo, ProcessVerdict, RiskLevel,
    SignatureRecord,
};
use crate::store::StoreSnapshot;
use rayon::prelude::*;
use std::path::PathBuf;

/// Errors surfaced by classification
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Malformed observation (empty file name)
    #[error("invalid module observation: {0}")]
    InvalidInput(String),
    /// Two active signatures claim the observation's content hash. The
    /// store is inconsistent; reported rather than silently resolved.
    #[error("content hash {hash} matches multiple signatures: {first}, {second}")]
    HashCollision {
        hash: String,
        first: String,
        second: String,
    },
}

/// Classify one module observation against a store snapshot.
///
/// Returns a `MatchResult` whose `confidence` reflects how the module was
/// matched; "no match" is `MatchConfidence::None`, not an error.
pub fn classify_module(
    observation: &ModuleObservation,
    snapshot: &StoreSnapshot,
) -> Result<MatchResult, ClassifyError> {
    if observation.file_name.trim().is_empty() {
        return Err(ClassifyError::InvalidInput(format!(
            "observation for {} has an empty file name",
            observation.path.display()
        )));
    }

    // Hash match takes precedence and must be unambiguous
    if let Some(hash) = &observation.content_hash {
        let mut hash_matches = snapshot
            .active_records()
            .filter(|sig| sig.content_hashes.iter().any(|h| h.eq_ignore_ascii_case(hash)));

        if let Some(first) = hash_matches.next() {
            if let Some(second) = hash_matches.next() {
                return Err(ClassifyError::HashCollision {
                    hash: hash.clone(),
                    first: first.id.clone(),
                    second: second.id.clone(),
                });
            }
            return Ok(MatchResult {
                observation: observation.clone(),
                signature: Some(first.into()),
                confidence: MatchConfidence::ExactHash,
            });
        }
    }

    // Filename substring match; deterministic selection among candidates
    let file_name = observation.file_name.to_lowercase();
    let best = snapshot
        .active_records()
        .filter(|sig| filename_matches(&file_name, sig))
        .min_by(|a, b| {
            b.severity_score
                .total_cmp(&a.severity_score)
                .then_with(|| a.id.cmp(&b.id))
        });

    Ok(match best {
        Some(sig) => MatchResult {
            observation: observation.clone(),
            signature: Some(sig.into()),
            confidence: MatchConfidence::FilenameMatch,
        },
        None => MatchResult {
            observation: observation.clone(),
            signature: None,
            confidence: MatchConfidence::None,
        },
    })
}

/// True if any of the signature's patterns occurs in `file_name` as a
/// case-insensitive substring. `file_name` must already be lowercased.
fn filename_matches(file_name: &str, signature: &SignatureRecord) -> bool {
    signature
        .file_signatures
        .iter()
        .any(|pattern| file_name.contains(&pattern.to_lowercase()))
}

/// A module observation that could not be classified, kept alongside the
/// failure reason so callers can report it
#[derive(Debug)]
pub struct ModuleFailure {
    pub path: PathBuf,
    pub error: ClassifyError,
}

/// Verdict for one process plus the modules that defeated classification
#[derive(Debug)]
pub struct ClassificationOutcome {
    pub verdict: ProcessVerdict,
    pub failures: Vec<ModuleFailure>,
}

/// Classify all of a process's modules and build its verdict.
///
/// Observations that fail classification (malformed input, hash collision)
/// cannot contribute a match and must not sink the verdicts of well-formed
/// modules, but they are never dropped silently: each failure is returned
/// in the outcome for the caller to report. Input order is preserved.
pub fn classify_process(
    process: &ProcessInfo,
    observations: &[ModuleObservation],
    snapshot: &StoreSnapshot,
) -> ClassificationOutcome {
    let outcomes: Vec<Result<MatchResult, ModuleFailure>> = observations
        .par_iter()
        .map(|obs| {
            classify_module(obs, snapshot).map_err(|error| ModuleFailure {
                path: obs.path.clone(),
                error,
            })
        })
        .collect();

    let mut module_matches = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => module_matches.push(result),
            Err(failure) => failures.push(failure),
        }
    }

    let aggregate_risk = module_matches
        .iter()
        .map(MatchResult::risk)
        .max()
        .unwrap_or(RiskLevel::Safe);

    ClassificationOutcome {
        verdict: ProcessVerdict {
            pid: process.pid,
            process_name: process.name.clone(),
            module_matches,
            aggregate_risk,
        },
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, SignatureRecord};
    use chrono::Utc;
    use std::path::PathBuf;

    /// Helper to build a signature with filename patterns
    fn make_signature(id: &str, patterns: Vec<&str>, risk: RiskLevel) -> SignatureRecord {
        SignatureRecord {
            id: id.to_string(),
            display_name: id.to_string(),
            file_signatures: patterns.into_iter().map(String::from).collect(),
            content_hashes: vec![],
            risk_level: risk,
            category: Category::Hack,
            active: true,
            severity_score: 8.0,
            last_updated: Utc::now(),
            description: String::new(),
            first_seen: None,
        }
    }

    fn make_observation(file_name: &str) -> ModuleObservation {
        ModuleObservation::from_path(PathBuf::from(file_name), None)
    }

    fn snapshot_of(records: Vec<SignatureRecord>) -> StoreSnapshot {
        StoreSnapshot::from_records(records)
    }

    // ==================== filename matching tests ====================

    #[test]
    fn test_substring_match_on_filename() {
        let snapshot = snapshot_of(vec![make_signature(
            "wurst",
            vec!["wurst"],
            RiskLevel::Dangerous,
        )]);
        let result = classify_module(&make_observation("wurst_client.dll"), &snapshot).unwrap();

        assert_eq!(result.confidence, MatchConfidence::FilenameMatch);
        assert_eq!(result.signature.unwrap().id, "wurst");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let snapshot = snapshot_of(vec![make_signature(
            "wurst",
            vec!["Wurst.DLL"],
            RiskLevel::Dangerous,
        )]);
        let result = classify_module(&make_observation("WURST.dll"), &snapshot).unwrap();
        assert_eq!(result.confidence, MatchConfidence::FilenameMatch);
    }

    #[test]
    fn test_unknown_module_is_none() {
        let snapshot = snapshot_of(vec![make_signature(
            "wurst",
            vec!["wurst"],
            RiskLevel::Dangerous,
        )]);
        let result = classify_module(&make_observation("kernel32.dll"), &snapshot).unwrap();

        assert_eq!(result.confidence, MatchConfidence::None);
        assert!(result.signature.is_none());
        assert_eq!(result.risk(), RiskLevel::Safe);
    }

    #[test]
    fn test_inactive_signature_is_invisible() {
        let mut sig = make_signature("wurst", vec!["wurst"], RiskLevel::Dangerous);
        sig.active = false;
        let snapshot = snapshot_of(vec![sig]);

        let result = classify_module(&make_observation("wurst_client.dll"), &snapshot).unwrap();
        assert_eq!(result.confidence, MatchConfidence::None);
    }

    #[test]
    fn test_ambiguous_match_prefers_highest_severity() {
        let mut low = make_signature("aaa_low", vec!["client"], RiskLevel::Suspicious);
        low.severity_score = 3.0;
        let mut high = make_signature("zzz_high", vec!["client"], RiskLevel::Dangerous);
        high.severity_score = 9.0;
        let snapshot = snapshot_of(vec![low, high]);

        let result = classify_module(&make_observation("some_client.dll"), &snapshot).unwrap();
        assert_eq!(result.signature.unwrap().id, "zzz_high");
    }

    #[test]
    fn test_severity_tie_broken_by_smallest_id() {
        let a = make_signature("alpha", vec!["client"], RiskLevel::Dangerous);
        let b = make_signature("beta", vec!["client"], RiskLevel::Dangerous);
        // Same severity either way round
        let snapshot = snapshot_of(vec![b, a]);

        let result = classify_module(&make_observation("client.dll"), &snapshot).unwrap();
        assert_eq!(result.signature.unwrap().id, "alpha");
    }

    #[test]
    fn test_empty_file_name_is_invalid_input() {
        let snapshot = snapshot_of(vec![]);
        let obs = ModuleObservation {
            path: PathBuf::from("/"),
            file_name: String::new(),
            content_hash: None,
            load_timestamp: Utc::now(),
        };
        assert!(matches!(
            classify_module(&obs, &snapshot),
            Err(ClassifyError::InvalidInput(_))
        ));
    }

    // ==================== hash matching tests ====================

    #[test]
    fn test_hash_match_overrides_filename() {
        let mut hash_sig = make_signature("by_hash", vec![], RiskLevel::Dangerous);
        hash_sig.content_hashes = vec!["aa".repeat(32)];
        let name_sig = make_signature("by_name", vec!["innocent"], RiskLevel::Suspicious);
        let snapshot = snapshot_of(vec![hash_sig, name_sig]);

        // Filename points at one signature, hash at another; hash wins
        let obs = ModuleObservation::from_path(
            PathBuf::from("innocent.dll"),
            Some("aa".repeat(32)),
        );
        let result = classify_module(&obs, &snapshot).unwrap();

        assert_eq!(result.confidence, MatchConfidence::ExactHash);
        assert_eq!(result.signature.unwrap().id, "by_hash");
    }

    #[test]
    fn test_hash_comparison_ignores_case() {
        let mut sig = make_signature("by_hash", vec![], RiskLevel::Dangerous);
        sig.content_hashes = vec!["ABCDEF01".to_string()];
        let snapshot = snapshot_of(vec![sig]);

        let obs =
            ModuleObservation::from_path(PathBuf::from("mod.dll"), Some("abcdef01".to_string()));
        let result = classify_module(&obs, &snapshot).unwrap();
        assert_eq!(result.confidence, MatchConfidence::ExactHash);
    }

    #[test]
    fn test_unmatched_hash_falls_back_to_filename() {
        let snapshot = snapshot_of(vec![make_signature(
            "wurst",
            vec!["wurst"],
            RiskLevel::Dangerous,
        )]);
        let obs =
            ModuleObservation::from_path(PathBuf::from("wurst.dll"), Some("ff".repeat(32)));

        let result = classify_module(&obs, &snapshot).unwrap();
        assert_eq!(result.confidence, MatchConfidence::FilenameMatch);
    }

    #[test]
    fn test_hash_collision_is_reported() {
        let mut a = make_signature("a", vec!["a"], RiskLevel::Dangerous);
        a.content_hashes = vec!["cc".repeat(32)];
        let mut b = make_signature("b", vec!["b"], RiskLevel::Dangerous);
        b.content_hashes = vec!["cc".repeat(32)];
        let snapshot = snapshot_of(vec![a, b]);

        let obs = ModuleObservation::from_path(PathBuf::from("mod.dll"), Some("cc".repeat(32)));
        assert!(matches!(
            classify_module(&obs, &snapshot),
            Err(ClassifyError::HashCollision { .. })
        ));
    }

    #[test]
    fn test_inactive_signature_hash_is_ignored() {
        let mut sig = make_signature("by_hash", vec![], RiskLevel::Dangerous);
        sig.content_hashes = vec!["dd".repeat(32)];
        sig.active = false;
        let snapshot = snapshot_of(vec![sig]);

        let obs = ModuleObservation::from_path(PathBuf::from("mod.dll"), Some("dd".repeat(32)));
        let result = classify_module(&obs, &snapshot).unwrap();
        assert_eq!(result.confidence, MatchConfidence::None);
    }

    // ==================== determinism tests ====================

    #[test]
    fn test_classification_is_idempotent() {
        let snapshot = snapshot_of(vec![
            make_signature("wurst", vec!["wurst"], RiskLevel::Dangerous),
            make_signature("impact", vec!["impact"], RiskLevel::Dangerous),
        ]);
        let obs = make_observation("wurst_client.dll");

        let first = classify_module(&obs, &snapshot).unwrap();
        let second = classify_module(&obs, &snapshot).unwrap();

        assert_eq!(first.confidence, second.confidence);
        assert_eq!(
            first.signature.as_ref().map(|s| &s.id),
            second.signature.as_ref().map(|s| &s.id)
        );
    }

    // ==================== process verdict tests ====================

    #[test]
    fn test_verdict_aggregates_max_risk() {
        let snapshot = snapshot_of(vec![
            make_signature("wurst", vec!["wurst"], RiskLevel::Dangerous),
            {
                let mut s = make_signature("ce", vec!["cheatengine"], RiskLevel::Suspicious);
                s.severity_score = 7.0;
                s
            },
        ]);
        let process = ProcessInfo {
            pid: 4242,
            name: "javaw.exe".to_string(),
        };
        let observations = vec![
            make_observation("kernel32.dll"),
            make_observation("cheatengine.exe"),
            make_observation("wurst_client.dll"),
        ];

        let outcome = classify_process(&process, &observations, &snapshot);
        let verdict = outcome.verdict;

        assert!(outcome.failures.is_empty());
        assert_eq!(verdict.aggregate_risk, RiskLevel::Dangerous);
        assert_eq!(verdict.module_matches.len(), 3);
        // Scan order preserved
        assert_eq!(verdict.module_matches[0].observation.file_name, "kernel32.dll");
        assert_eq!(verdict.module_matches[0].confidence, MatchConfidence::None);
        assert_eq!(
            verdict.module_matches[2].signature.as_ref().unwrap().id,
            "wurst"
        );
    }

    #[test]
    fn test_verdict_with_no_matches_is_safe() {
        let snapshot = snapshot_of(vec![make_signature(
            "wurst",
            vec!["wurst"],
            RiskLevel::Dangerous,
        )]);
        let process = ProcessInfo {
            pid: 1,
            name: "java.exe".to_string(),
        };
        let observations = vec![
            make_observation("kernel32.dll"),
            make_observation("user32.dll"),
        ];

        let outcome = classify_process(&process, &observations, &snapshot);
        assert_eq!(outcome.verdict.aggregate_risk, RiskLevel::Safe);
    }

    #[test]
    fn test_verdict_with_no_modules_is_safe() {
        let snapshot = snapshot_of(vec![]);
        let process = ProcessInfo {
            pid: 1,
            name: "java.exe".to_string(),
        };
        let outcome = classify_process(&process, &[], &snapshot);
        assert_eq!(outcome.verdict.aggregate_risk, RiskLevel::Safe);
        assert!(outcome.verdict.module_matches.is_empty());
    }

    #[test]
    fn test_unclassifiable_module_is_surfaced_not_dropped() {
        let mut a = make_signature("a", vec![], RiskLevel::Dangerous);
        a.content_hashes = vec!["cc".repeat(32)];
        let mut b = make_signature("b", vec![], RiskLevel::Dangerous);
        b.content_hashes = vec!["cc".repeat(32)];
        let snapshot = snapshot_of(vec![
            a,
            b,
            make_signature("wurst", vec!["wurst"], RiskLevel::Dangerous),
        ]);
        let process = ProcessInfo {
            pid: 1,
            name: "javaw.exe".to_string(),
        };
        let observations = vec![
            ModuleObservation::from_path(PathBuf::from("mod.dll"), Some("cc".repeat(32))),
            make_observation("wurst_client.dll"),
        ];

        let outcome = classify_process(&process, &observations, &snapshot);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, PathBuf::from("mod.dll"));
        assert!(matches!(
            outcome.failures[0].error,
            ClassifyError::HashCollision { .. }
        ));
        // The well-formed module is still matched
        assert_eq!(outcome.verdict.module_matches.len(), 1);
        assert_eq!(outcome.verdict.aggregate_risk, RiskLevel::Dangerous);
    }
}
