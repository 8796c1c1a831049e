//! Scan session manager
//!
//! Coordinates repeated classification passes and owns the session state
//! machine:
//! - Idle -> Running via `start_session`, Running -> Idle via `stop_session`
//! - `run_single_pass` is valid in either state and never changes it
//! - threat deduplication per (pid, signature id), cleared on stop
//! - bounded event history (independent of session lifecycle)
//!
//! The session owns no scheduler: cadence is the caller's job (timer or
//! loop), `run_single_pass` is the unit of work.

pub mod events;

use crate::classifier;
use crate::enumeration::ModuleEnumerator;
use crate::models::{EventKind, ProcessVerdict, RiskLevel, ScanEvent, ThreatDetail};
use crate::store::StoreSnapshot;
use events::{EventLog, EventLogError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Session state misuse and pass-concurrency errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a scan session is already running")]
    AlreadyRunning,
    #[error("no scan session is running")]
    NotRunning,
    /// A pass was invoked while another pass was still executing. Policy:
    /// the late invocation is rejected, never queued or interleaved.
    #[error("a scan pass is already in flight")]
    Busy,
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    #[error("process enumeration failed: {0}")]
    Enumeration(#[from] crate::enumeration::EnumerationError),
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// Outcome summary of one pass, for callers that print progress
#[derive(Debug, Clone, serde::Serialize)]
pub struct PassSummary {
    pub processes_scanned: usize,
    pub processes_skipped: usize,
    pub threats_found: usize,
    pub duration_ms: u64,
}

/// One scan session over one engine instance. Holds session state as an
/// owned object, never ambient/global state, so independent sessions can
/// coexist (e.g. per monitored host).
pub struct ScanSession {
    state: SessionState,
    /// (pid, signature id) pairs already reported this session
    reported: HashSet<(u32, String)>,
    event_log: EventLog,
    last_verdicts: Vec<ProcessVerdict>,
    pass_in_flight: AtomicBool,
}

impl ScanSession {
    pub fn new(event_log: EventLog) -> Self {
        Self {
            state: SessionState::Idle,
            reported: HashSet::new(),
            event_log,
            last_verdicts: Vec::new(),
            pass_in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent pass's verdicts; superseded wholesale by the next pass
    pub fn last_verdicts(&self) -> &[ProcessVerdict] {
        &self.last_verdicts
    }

    /// Transition Idle -> Running. Explicitly errors when already Running
    /// so callers (and tests) can assert state instead of silently
    /// no-opping.
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Running {
            return Err(SessionError::AlreadyRunning);
        }
        self.state = SessionState::Running;
        self.reported.clear();
        self.event_log
            .append(ScanEvent::new(EventKind::Info, "Scan session started"))?;
        Ok(())
    }

    /// Transition Running -> Idle and clear the deduplication set. The
    /// event log is not cleared; it is bounded independently.
    pub fn stop_session(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Idle {
            return Err(SessionError::NotRunning);
        }
        self.state = SessionState::Idle;
        self.reported.clear();
        self.event_log
            .append(ScanEvent::new(EventKind::Info, "Scan session stopped"))?;
        Ok(())
    }

    /// Perform one classification cycle over all currently enumerable
    /// processes. Valid in either state; does not change session state.
    ///
    /// Per-process enumeration failures are recovered locally: the process
    /// is skipped, an error event is appended, and the pass continues. The
    /// same applies to single modules the engine cannot classify (bad
    /// input, signature hash collision): an error event per module, the
    /// rest of the process is still classified. Failure to list processes
    /// at all aborts the pass (after logging).
    pub fn run_single_pass<E: ModuleEnumerator>(
        &mut self,
        enumerator: &mut E,
        snapshot: &StoreSnapshot,
    ) -> Result<PassSummary, SessionError> {
        if self.pass_in_flight.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }
        let result = self.run_pass_inner(enumerator, snapshot);
        self.pass_in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn run_pass_inner<E: ModuleEnumerator>(
        &mut self,
        enumerator: &mut E,
        snapshot: &StoreSnapshot,
    ) -> Result<PassSummary, SessionError> {
        let start = Instant::now();

        let processes = match enumerator.processes() {
            Ok(processes) => processes,
            Err(err) => {
                self.event_log.append(ScanEvent::new(
                    EventKind::Error,
                    format!("Process enumeration failed: {}", err),
                ))?;
                return Err(err.into());
            }
        };

        let mut verdicts = Vec::with_capacity(processes.len());
        let mut skipped = 0usize;
        let mut threats = 0usize;

        for process in &processes {
            let observations = match enumerator.modules(process.pid) {
                Ok(observations) => observations,
                Err(err) => {
                    // One inaccessible process must not blind the scan to
                    // the others
                    skipped += 1;
                    self.event_log.append(ScanEvent::new(
                        EventKind::Error,
                        format!(
                            "Skipping process {} (pid {}): {}",
                            process.name, process.pid, err
                        ),
                    ))?;
                    continue;
                }
            };

            let outcome = classifier::classify_process(process, &observations, snapshot);
            for failure in &outcome.failures {
                // A module the engine cannot classify yields no match, but
                // the failure must leave a trace in the log
                self.event_log.append(ScanEvent::new(
                    EventKind::Error,
                    format!(
                        "Cannot classify module {} in {} (pid {}): {}",
                        failure.path.display(),
                        process.name,
                        process.pid,
                        failure.error
                    ),
                ))?;
            }
            threats += self.record_threats(&outcome.verdict)?;
            verdicts.push(outcome.verdict);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.event_log.append(ScanEvent::new(
            EventKind::Info,
            format!(
                "Pass complete: {} process(es) scanned, {} skipped, {} new threat(s), {} ms",
                verdicts.len(),
                skipped,
                threats,
                duration_ms
            ),
        ))?;

        let summary = PassSummary {
            processes_scanned: verdicts.len(),
            processes_skipped: skipped,
            threats_found: threats,
            duration_ms,
        };
        self.last_verdicts = verdicts;
        Ok(summary)
    }

    /// Append a threat event for each suspicious-or-worse match not yet
    /// reported this session. Returns the number of new threat events.
    fn record_threats(&mut self, verdict: &ProcessVerdict) -> Result<usize, SessionError> {
        let mut new_threats = 0;

        for result in &verdict.module_matches {
            let Some(signature) = &result.signature else {
                continue;
            };
            if result.risk() < RiskLevel::Suspicious {
                continue;
            }

            let key = (verdict.pid, signature.id.clone());
            if self.reported.contains(&key) {
                continue;
            }

            let detail = ThreatDetail {
                signature_id: signature.id.clone(),
                threat_name: signature.display_name.clone(),
                risk_level: signature.risk_level,
                confidence: result.confidence,
                detected_file: result.observation.file_name.clone(),
                pid: verdict.pid,
                process_name: verdict.process_name.clone(),
            };
            self.event_log.append(ScanEvent::threat(
                format!(
                    "Cheat client detected: {} in {} (pid {})",
                    signature.display_name, verdict.process_name, verdict.pid
                ),
                detail,
            ))?;

            self.reported.insert(key);
            new_threats += 1;
        }

        Ok(new_threats)
    }

    /// Most recent `limit` events, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<ScanEvent> {
        self.event_log.recent(limit)
    }

    /// All retained events, oldest first
    pub fn all_events(&self) -> Vec<ScanEvent> {
        self.event_log.all()
    }

    /// Empty the event log
    pub fn clear_events(&mut self) -> Result<(), SessionError> {
        self.event_log.clear()?;
        Ok(())
    }
}
