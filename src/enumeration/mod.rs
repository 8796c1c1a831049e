//! Process/module enumeration capability
//!
//! The engine never talks to the OS directly: it consumes a
//! `ModuleEnumerator`, so scan logic is testable with fakes and portable
//! across platforms. The shipped implementation is sysinfo-backed and
//! reports each matching process's main executable as its observable
//! module, optionally content-hashed.

use crate::constants::{DEFAULT_ENUMERATION_TIMEOUT_MS, DEFAULT_PROCESS_FILTERS};
use crate::models::{ModuleObservation, ProcessInfo};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, Instant};
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

/// Enumeration failure modes. All distinguishable so callers can report
/// the reason a process was skipped.
#[derive(Debug, thiserror::Error)]
pub enum EnumerationError {
    #[error("process {0} not found")]
    ProcessNotFound(u32),
    #[error("access denied enumerating process {0}")]
    AccessDenied(u32),
    #[error("module enumeration for process {0} timed out after {1:?}")]
    Timeout(u32, Duration),
    #[error("enumeration I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability that lists processes of interest and their loaded modules.
///
/// Failure of `modules` for one process must never be treated as fatal by
/// callers driving a scan pass; the process is skipped and the pass
/// continues.
pub trait ModuleEnumerator {
    /// Currently running processes of interest
    fn processes(&mut self) -> Result<Vec<ProcessInfo>, EnumerationError>;

    /// Modules loaded by the process with `pid`
    fn modules(&mut self, pid: u32) -> Result<Vec<ModuleObservation>, EnumerationError>;
}

/// sysinfo-backed enumerator watching processes whose names contain one of
/// the configured filter strings (case-insensitive).
pub struct SystemEnumerator {
    system: System,
    process_filters: Vec<String>,
    hash_modules: bool,
    timeout: Duration,
}

impl SystemEnumerator {
    pub fn new(process_filters: Vec<String>, hash_modules: bool) -> Self {
        let filters = if process_filters.is_empty() {
            DEFAULT_PROCESS_FILTERS.iter().map(|s| s.to_string()).collect()
        } else {
            process_filters
        };
        Self {
            system: System::new(),
            process_filters: filters.into_iter().map(|f| f.to_lowercase()).collect(),
            hash_modules,
            timeout: Duration::from_millis(DEFAULT_ENUMERATION_TIMEOUT_MS),
        }
    }

    /// Override the per-process enumeration timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn name_matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.process_filters.iter().any(|f| name.contains(f))
    }
}

impl ModuleEnumerator for SystemEnumerator {
    fn processes(&mut self) -> Result<Vec<ProcessInfo>, EnumerationError> {
        self.system.refresh_processes();

        let mut processes: Vec<ProcessInfo> = self
            .system
            .processes()
            .iter()
            .filter(|(_, process)| self.name_matches(process.name()))
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect();

        // Stable output order keeps passes reproducible
        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn modules(&mut self, pid: u32) -> Result<Vec<ModuleObservation>, EnumerationError> {
        let start = Instant::now();

        let process = self
            .system
            .process(sysinfo::Pid::from_u32(pid))
            .ok_or(EnumerationError::ProcessNotFound(pid))?;

        let exe = process.exe();
        if exe.as_os_str().is_empty() {
            // sysinfo yields an empty path when the platform refuses to
            // reveal the executable of a foreign process
            return Err(EnumerationError::AccessDenied(pid));
        }

        let content_hash = if self.hash_modules {
            hash_file_bounded(exe, start, self.timeout, pid)?
        } else {
            None
        };

        if start.elapsed() > self.timeout {
            return Err(EnumerationError::Timeout(pid, self.timeout));
        }

        Ok(vec![ModuleObservation::from_path(
            exe.to_path_buf(),
            content_hash,
        )])
    }
}

/// SHA-256 of a file, read in chunks and abandoned once `timeout` elapses.
/// An unreadable file is not fatal for hashing purposes: filename matching
/// still applies, so the hash is simply absent.
fn hash_file_bounded(
    path: &Path,
    start: Instant,
    timeout: Duration,
    pid: u32,
) -> Result<Option<String>, EnumerationError> {
    use std::io::Read;

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(err) => {
            log::debug!("Cannot hash {}: {}", path.display(), err);
            return Ok(None);
        }
    };

    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        if start.elapsed() > timeout {
            return Err(EnumerationError::Timeout(pid, timeout));
        }
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(Some(hex::encode(hasher.finalize())))
}
