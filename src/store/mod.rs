//! Signature store module
//!
//! CRUD over signature records with flat-file JSON durability:
//! - add / update / remove / toggle_active, persisting on every change
//! - snapshot() for point-in-time views consumed by scan passes
//! - load_or_initialize() to seed an empty store with defaults
//!
//! The backing document is a versioned envelope so the database file is
//! self-describing and future format migrations stay possible.

pub mod defaults;

use crate::constants::SIGNATURE_DB_VERSION;
use crate::models::{SignatureRecord, SignatureUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors surfaced by signature store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record violates a store invariant (duplicate id, no matchable
    /// feature, severity out of range, duplicate content hash)
    #[error("invalid signature record: {0}")]
    Validation(String),
    /// Operation referenced an id the store does not contain
    #[error("signature not found: {0}")]
    NotFound(String),
    /// The backing file violates a store invariant and cannot be trusted
    #[error("signature database inconsistent: {0}")]
    Consistency(String),
    #[error("signature database I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("signature database parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk envelope wrapping the signature records
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignatureDatabase {
    version: String,
    last_updated: DateTime<Utc>,
    total_signatures: usize,
    signatures: Vec<SignatureRecord>,
}

/// Immutable point-in-time view of all records. Cloning is cheap; a scan
/// pass holds one snapshot so concurrent store edits never affect it.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    records: Arc<Vec<SignatureRecord>>,
    taken_at: DateTime<Utc>,
}

impl StoreSnapshot {
    pub fn records(&self) -> &[SignatureRecord] {
        &self.records
    }

    /// Records eligible for matching
    pub fn active_records(&self) -> impl Iterator<Item = &SignatureRecord> {
        self.records.iter().filter(|r| r.active)
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build a snapshot directly from records, bypassing any backing file.
    /// Intended for tests and embedded use.
    pub fn from_records(records: Vec<SignatureRecord>) -> Self {
        Self {
            records: Arc::new(records),
            taken_at: Utc::now(),
        }
    }
}

/// File-backed signature store. All mutations go through the store's own
/// operations and persist before returning.
pub struct SignatureStore {
    path: PathBuf,
    records: Vec<SignatureRecord>,
}

impl SignatureStore {
    /// Open the store at `path`, creating an empty database file if none
    /// exists. Fails with `Consistency` if the existing file carries two
    /// active signatures claiming the same content hash.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let db: SignatureDatabase = serde_json::from_str(&raw)?;
            db.signatures
        } else {
            Vec::new()
        };

        verify_consistency(&records)?;

        let mut store = Self { path, records };
        if !store.path.exists() {
            store.persist()?;
        }
        Ok(store)
    }

    /// Seed the store with `defaults` exactly once: only when the backing
    /// store holds no records at all.
    pub fn load_or_initialize(
        path: impl Into<PathBuf>,
        defaults: Vec<SignatureRecord>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::open(path)?;
        if store.records.is_empty() && !defaults.is_empty() {
            verify_consistency(&defaults)?;
            for record in &defaults {
                validate_record(record)?;
            }
            log::info!("Seeding signature database with {} defaults", defaults.len());
            store.records = defaults;
            store.persist()?;
        }
        Ok(store)
    }

    /// Add a new record. Fails with `Validation` if the id collides or the
    /// record has no matchable feature.
    pub fn add(&mut self, mut record: SignatureRecord) -> Result<(), StoreError> {
        validate_record(&record)?;
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Validation(format!(
                "id already exists: {}",
                record.id
            )));
        }
        self.check_hash_uniqueness(&record.content_hashes, None)?;
        record.last_updated = Utc::now();
        self.records.push(record);
        self.persist()
    }

    /// Apply a partial update to the record with `id`, refreshing
    /// `last_updated`. Fails with `NotFound` for an unknown id.
    pub fn update(&mut self, id: &str, fields: SignatureUpdate) -> Result<(), StoreError> {
        // Validate hash uniqueness before taking the mutable borrow
        if let Some(ref hashes) = fields.content_hashes {
            self.check_hash_uniqueness(hashes, Some(id))?;
        }

        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut updated = record.clone();
        if let Some(v) = fields.display_name {
            updated.display_name = v;
        }
        if let Some(v) = fields.file_signatures {
            updated.file_signatures = v;
        }
        if let Some(v) = fields.content_hashes {
            updated.content_hashes = v;
        }
        if let Some(v) = fields.risk_level {
            updated.risk_level = v;
        }
        if let Some(v) = fields.category {
            updated.category = v;
        }
        if let Some(v) = fields.severity_score {
            updated.severity_score = v;
        }
        if let Some(v) = fields.description {
            updated.description = v;
        }
        updated.last_updated = Utc::now();

        validate_record(&updated)?;
        *record = updated;
        self.persist()
    }

    /// Permanently remove the record with `id` (no soft-delete)
    pub fn remove(&mut self, id: &str) -> Result<SignatureRecord, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = self.records.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Flip the `active` flag of the record with `id`. Returns the new state.
    ///
    /// Re-activation re-checks the active-hash invariant: a hand-edited
    /// database may carry an inactive record whose content hash duplicates
    /// an active one (tolerated on load), and flipping it on must not
    /// create the ambiguity `open` rejects.
    pub fn toggle_active(&mut self, id: &str) -> Result<bool, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !self.records[index].active {
            for hash in &self.records[index].content_hashes {
                if let Some(owner) = self.records.iter().find(|r| {
                    r.id != id
                        && r.active
                        && r.content_hashes.iter().any(|h| h.eq_ignore_ascii_case(hash))
                }) {
                    return Err(StoreError::Validation(format!(
                        "cannot activate {}: content hash {} already claimed by active signature {}",
                        id, hash, owner.id
                    )));
                }
            }
        }

        let record = &mut self.records[index];
        record.active = !record.active;
        record.last_updated = Utc::now();
        let now_active = record.active;
        self.persist()?;
        Ok(now_active)
    }

    /// Immutable point-in-time view of all records
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: Arc::new(self.records.clone()),
            taken_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SignatureRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reject hashes already claimed by a different record. Two signatures
    /// must never share a content hash: an exact-hash match has to be
    /// unambiguous.
    fn check_hash_uniqueness(
        &self,
        hashes: &[String],
        exclude_id: Option<&str>,
    ) -> Result<(), StoreError> {
        for hash in hashes {
            if let Some(owner) = self.records.iter().find(|r| {
                Some(r.id.as_str()) != exclude_id
                    && r.content_hashes.iter().any(|h| h.eq_ignore_ascii_case(hash))
            }) {
                return Err(StoreError::Validation(format!(
                    "content hash {} already claimed by signature {}",
                    hash, owner.id
                )));
            }
        }
        Ok(())
    }

    /// Write the full database atomically: write to a temp file in the same
    /// directory, then rename over the target.
    fn persist(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let db = SignatureDatabase {
            version: SIGNATURE_DB_VERSION.to_string(),
            last_updated: Utc::now(),
            total_signatures: self.records.len(),
            signatures: self.records.clone(),
        };

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&db)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Validate a single record against the store invariants
fn validate_record(record: &SignatureRecord) -> Result<(), StoreError> {
    if record.id.trim().is_empty() {
        return Err(StoreError::Validation("id must not be empty".to_string()));
    }
    if !record.has_matchable_feature() {
        return Err(StoreError::Validation(format!(
            "signature {} has no file signatures and no content hashes",
            record.id
        )));
    }
    if !(0.0..=10.0).contains(&record.severity_score) {
        return Err(StoreError::Validation(format!(
            "severity_score {} out of range 0.0-10.0 for signature {}",
            record.severity_score, record.id
        )));
    }
    if record.file_signatures.iter().any(|p| p.trim().is_empty()) {
        return Err(StoreError::Validation(format!(
            "signature {} contains an empty file signature pattern",
            record.id
        )));
    }
    Ok(())
}

/// Cross-record invariants for a loaded record set: unique ids, and no
/// content hash shared between active signatures.
fn verify_consistency(records: &[SignatureRecord]) -> Result<(), StoreError> {
    let mut ids = HashSet::new();
    for record in records {
        if !ids.insert(record.id.as_str()) {
            return Err(StoreError::Consistency(format!(
                "duplicate signature id: {}",
                record.id
            )));
        }
    }

    let mut hashes: HashSet<String> = HashSet::new();
    for record in records.iter().filter(|r| r.active) {
        for hash in &record.content_hashes {
            if !hashes.insert(hash.to_lowercase()) {
                return Err(StoreError::Consistency(format!(
                    "content hash {} appears on more than one active signature",
                    hash
                )));
            }
        }
    }
    Ok(())
}
