//! Continuous monitoring mode
//!
//! Drives repeated scan passes at a fixed cadence until the interrupt flag
//! is raised (Ctrl-C). The session supplies the pass logic and event log;
//! this module only owns timing and console output.

use crate::enumeration::ModuleEnumerator;
use crate::output;
use crate::session::{ScanSession, SessionError};
use crate::store::SignatureStore;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Console behavior for the monitoring loop
pub struct MonitorOutput {
    pub json_output: bool,
    pub quiet_mode: bool,
}

/// Run scan passes every `interval` until `interrupted` becomes true.
///
/// A failed pass (e.g. process listing denied) is reported and the loop
/// continues; transient enumeration trouble must not end monitoring. The
/// signature store is re-snapshotted each cycle so database edits made
/// while monitoring take effect on the next pass.
pub fn run_monitor_loop<E: ModuleEnumerator>(
    session: &mut ScanSession,
    enumerator: &mut E,
    store: &SignatureStore,
    interval: Duration,
    interrupted: Arc<AtomicBool>,
    out: &MonitorOutput,
) -> Result<()> {
    session.start_session()?;

    if !out.quiet_mode && !out.json_output {
        println!(
            "Starting module monitoring (interval: {:.1}s)...",
            interval.as_secs_f64()
        );
        println!("Press Ctrl+C to stop monitoring.");
        println!();
    }

    while !interrupted.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        let snapshot = store.snapshot();
        let events_before = session.all_events().len();

        match session.run_single_pass(enumerator, &snapshot) {
            Ok(summary) => {
                // Print only what this cycle appended. If the bounded log
                // evicted entries during the pass the index is clamped.
                let all = session.all_events();
                let new_events = &all[events_before.min(all.len())..];
                for event in new_events {
                    if out.json_output {
                        println!("{}", output::format_event_json(event)?);
                    } else if !out.quiet_mode
                        || event.kind == crate::models::EventKind::Threat
                    {
                        println!("{}", output::format_event_human(event));
                    }
                }
                log::debug!(
                    "Cycle done: {} scanned, {} new threats",
                    summary.processes_scanned,
                    summary.threats_found
                );
            }
            Err(SessionError::Busy) => {
                // Previous pass overran the interval; skip this tick
                log::warn!("Scan pass still in flight, skipping cycle");
            }
            Err(err) => {
                log::error!("Scan pass failed: {}", err);
                if !out.quiet_mode && !out.json_output {
                    eprintln!("Scan pass failed: {}", err);
                }
            }
        }

        // Sleep the remainder of the interval, in short slices so Ctrl-C
        // is honored promptly
        let cycle_duration = cycle_start.elapsed();
        if let Some(mut remaining) = interval.checked_sub(cycle_duration) {
            while !remaining.is_zero() && !interrupted.load(Ordering::SeqCst) {
                let slice = remaining.min(Duration::from_millis(100));
                std::thread::sleep(slice);
                remaining -= slice;
            }
        }
    }

    session.stop_session()?;

    if !out.quiet_mode && !out.json_output {
        println!("Monitoring stopped.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumeration::EnumerationError;
    use crate::models::{ModuleObservation, ProcessInfo};
    use crate::session::events::EventLog;
    use crate::store::SignatureStore;
    use std::path::PathBuf;

    struct SingleProcessEnumerator;

    impl ModuleEnumerator for SingleProcessEnumerator {
        fn processes(&mut self) -> Result<Vec<ProcessInfo>, EnumerationError> {
            Ok(vec![ProcessInfo {
                pid: 100,
                name: "javaw.exe".to_string(),
            }])
        }

        fn modules(&mut self, _pid: u32) -> Result<Vec<ModuleObservation>, EnumerationError> {
            Ok(vec![ModuleObservation::from_path(
                PathBuf::from("wurst_client.dll"),
                None,
            )])
        }
    }

    #[test]
    fn test_loop_stops_when_interrupted_and_session_returns_idle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::load_or_initialize(
            dir.path().join("signatures.json"),
            crate::store::defaults::default_signatures(),
        )
        .unwrap();
        let mut session = ScanSession::new(EventLog::in_memory(100));
        let mut enumerator = SingleProcessEnumerator;

        // Pre-raised flag: the loop must exit after zero iterations
        let interrupted = Arc::new(AtomicBool::new(true));
        run_monitor_loop(
            &mut session,
            &mut enumerator,
            &store,
            Duration::from_millis(10),
            interrupted,
            &MonitorOutput {
                json_output: false,
                quiet_mode: true,
            },
        )
        .unwrap();

        assert_eq!(session.state(), crate::session::SessionState::Idle);
        let messages: Vec<String> =
            session.all_events().iter().map(|e| e.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("started")));
        assert!(messages.iter().any(|m| m.contains("stopped")));
    }

    #[test]
    fn test_interrupt_mid_sleep_exits_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let store = SignatureStore::load_or_initialize(
            dir.path().join("signatures.json"),
            vec![],
        )
        .unwrap();
        let mut session = ScanSession::new(EventLog::in_memory(100));
        let mut enumerator = SingleProcessEnumerator;

        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        let raiser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        run_monitor_loop(
            &mut session,
            &mut enumerator,
            &store,
            Duration::from_secs(60),
            interrupted,
            &MonitorOutput {
                json_output: false,
                quiet_mode: true,
            },
        )
        .unwrap();
        raiser.join().unwrap();

        // Far below the 60s interval: the sleep is sliced
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
