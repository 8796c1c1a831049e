//! Built-in default signature set
//!
//! Seeded into an empty signature database on first run. Covers the widely
//! distributed cheat clients plus the generic injector/memory-editor
//! utilities commonly used to load them.

use crate::models::{Category, RiskLevel, SignatureRecord};
use chrono::{NaiveDate, Utc};

struct DefaultEntry {
    id: &'static str,
    display_name: &'static str,
    file_signatures: &'static [&'static str],
    risk_level: RiskLevel,
    category: Category,
    severity_score: f64,
    description: &'static str,
    first_seen: Option<(i32, u32, u32)>,
}

const DEFAULT_ENTRIES: &[DefaultEntry] = &[
    DefaultEntry {
        id: "horion",
        display_name: "Horion",
        file_signatures: &["horion.dll", "horion_client.dll", "horion_launcher.exe"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 9.5,
        description: "Injection-based Bedrock Edition hack client",
        first_seen: Some((2019, 3, 15)),
    },
    DefaultEntry {
        id: "nitr0",
        display_name: "Nitr0",
        file_signatures: &["nitr0.dll", "nitr0.exe", "nitr0_launcher.exe"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 9.2,
        description: "Launcher/injector that loads cheat modules",
        first_seen: Some((2020, 1, 10)),
    },
    DefaultEntry {
        id: "wurst",
        display_name: "Wurst",
        file_signatures: &["wurst.dll", "wurst_client.dll", "wurst.jar"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 8.8,
        description: "Widely distributed mod-based hack client",
        first_seen: Some((2014, 8, 20)),
    },
    DefaultEntry {
        id: "liquidbounce",
        display_name: "LiquidBounce",
        file_signatures: &["liquidbounce.dll", "liquidbounce.jar"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 8.5,
        description: "Free and open-source injection hack client",
        first_seen: Some((2015, 6, 12)),
    },
    DefaultEntry {
        id: "impact",
        display_name: "Impact",
        file_signatures: &["impact.dll", "impact.jar", "impact_client.dll"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 8.3,
        description: "Utility mod and hack client",
        first_seen: Some((2017, 2, 28)),
    },
    DefaultEntry {
        id: "sigma",
        display_name: "Sigma",
        file_signatures: &["sigma.dll", "sigma_client.dll", "sigma5.dll"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 9.0,
        description: "Premium hack client",
        first_seen: Some((2018, 11, 5)),
    },
    DefaultEntry {
        id: "aristois",
        display_name: "Aristois",
        file_signatures: &["aristois.dll", "aristois.jar"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 8.0,
        description: "Mod-based hack client",
        first_seen: None,
    },
    DefaultEntry {
        id: "meteor",
        display_name: "Meteor",
        file_signatures: &["meteor.dll", "meteor-client.jar"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Hack,
        severity_score: 8.0,
        description: "Mod-based utility hack client",
        first_seen: None,
    },
    DefaultEntry {
        id: "cheat_engine",
        display_name: "Cheat Engine",
        file_signatures: &["cheatengine.exe", "cheat engine.exe", "ce.exe"],
        risk_level: RiskLevel::Suspicious,
        category: Category::Utility,
        severity_score: 7.0,
        description: "Memory scanner/editor usable to modify game values",
        first_seen: Some((2000, 1, 1)),
    },
    DefaultEntry {
        id: "generic_injector",
        display_name: "DLL Injector",
        file_signatures: &["injector.exe"],
        risk_level: RiskLevel::Dangerous,
        category: Category::Utility,
        severity_score: 7.5,
        description: "Generic DLL injection utility",
        first_seen: None,
    },
    DefaultEntry {
        id: "process_hacker",
        display_name: "Process Hacker",
        file_signatures: &["processhacker.exe", "process_hacker.exe"],
        risk_level: RiskLevel::Suspicious,
        category: Category::Utility,
        severity_score: 6.0,
        description: "Process inspection tool with memory write capability",
        first_seen: None,
    },
];

/// Records seeded into an empty signature database
pub fn default_signatures() -> Vec<SignatureRecord> {
    DEFAULT_ENTRIES
        .iter()
        .map(|entry| SignatureRecord {
            id: entry.id.to_string(),
            display_name: entry.display_name.to_string(),
            file_signatures: entry
                .file_signatures
                .iter()
                .map(|s| s.to_string())
                .collect(),
            content_hashes: vec![],
            risk_level: entry.risk_level,
            category: entry.category,
            active: true,
            severity_score: entry.severity_score,
            last_updated: Utc::now(),
            description: entry.description.to_string(),
            first_seen: entry
                .first_seen
                .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_ids_are_unique() {
        let records = default_signatures();
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn test_defaults_satisfy_store_invariants() {
        for record in default_signatures() {
            assert!(record.has_matchable_feature(), "{} has no features", record.id);
            assert!(
                (0.0..=10.0).contains(&record.severity_score),
                "{} severity out of range",
                record.id
            );
            assert!(record.active);
        }
    }

    #[test]
    fn test_defaults_include_known_clients() {
        let records = default_signatures();
        for id in ["horion", "wurst", "liquidbounce", "cheat_engine"] {
            assert!(records.iter().any(|r| r.id == id), "missing {}", id);
        }
    }
}
