//! Bounded, persisted event log
//!
//! Ring semantics: entries append in arrival order and the oldest entry is
//! evicted first once the configured maximum is exceeded. The log persists
//! as a JSON array after every mutation, so a crash loses at most the
//! in-flight append.

use crate::models::ScanEvent;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

/// Errors surfaced by event log persistence
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("event log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("event log parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// FIFO-bounded event history, optionally file-backed
pub struct EventLog {
    entries: VecDeque<ScanEvent>,
    max_entries: usize,
    path: Option<PathBuf>,
}

impl EventLog {
    /// In-memory log, no persistence. Used by tests and embedded callers.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            path: None,
        }
    }

    /// File-backed log; loads any existing history, trimming it to
    /// `max_entries` (oldest first) if the cap shrank since last run.
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self, EventLogError> {
        let path = path.into();
        let mut entries: VecDeque<ScanEvent> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<Vec<ScanEvent>>(&raw)?.into()
        } else {
            VecDeque::new()
        };

        let max_entries = max_entries.max(1);
        while entries.len() > max_entries {
            entries.pop_front();
        }

        Ok(Self {
            entries,
            max_entries,
            path: Some(path),
        })
    }

    /// Append one event, evicting the oldest entry when full
    pub fn append(&mut self, event: ScanEvent) -> Result<(), EventLogError> {
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
        self.persist()
    }

    /// Most recent `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Vec<ScanEvent> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// All retained events in insertion order (oldest first)
    pub fn all(&self) -> Vec<ScanEvent> {
        self.entries.iter().cloned().collect()
    }

    /// Empty the log. Always succeeds logically; persistence errors still
    /// surface so callers know the file is stale.
    pub fn clear(&mut self) -> Result<(), EventLogError> {
        self.entries.clear();
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn persist(&self) -> Result<(), EventLogError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let entries: Vec<&ScanEvent> = self.entries.iter().collect();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&entries)?)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}
