#![forbid(unsafe_code)]

mod classifier;
mod cli;
mod config;
mod constants;
mod enumeration;
mod models;
mod monitor;
mod output;
mod report;
mod session;
mod store;

use anyhow::{Context, Result};
use cli::{CliCommand, GlobalOptions, ReportFormat, SignatureAction};
use config::MonitorConfiguration;
use enumeration::SystemEnumerator;
use models::SignatureRecord;
use monitor::MonitorOutput;
use session::events::EventLog;
use session::ScanSession;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use store::SignatureStore;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (globals, command) = cli::parse_args()?;
    let data_dir = resolve_data_dir(&globals)?;

    match command {
        CliCommand::Scan(opts) => run_scan(&globals, &data_dir, opts),
        CliCommand::Monitor(opts) => run_monitor(&globals, &data_dir, opts),
        CliCommand::Signatures(action) => run_signatures(&globals, &data_dir, action),
        CliCommand::Report(opts) => run_report(&data_dir, opts),
    }
}

/// Data directory precedence: --data-dir, then `<data dir>/modscan`
fn resolve_data_dir(globals: &GlobalOptions) -> Result<PathBuf> {
    if let Some(dir) = &globals.data_dir {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|dir| dir.join("modscan"))
        .context("Cannot determine a data directory; pass --data-dir")
}

fn open_store(data_dir: &PathBuf) -> Result<SignatureStore> {
    SignatureStore::load_or_initialize(
        data_dir.join(constants::SIGNATURE_DB_FILE),
        store::defaults::default_signatures(),
    )
    .context("Failed to open the signature database")
}

fn load_config(path: Option<&PathBuf>) -> Result<MonitorConfiguration> {
    match path {
        Some(path) => MonitorConfiguration::load_from_file(path)
            .with_context(|| format!("Invalid configuration file: {}", path.display())),
        None => match MonitorConfiguration::default_config_path() {
            Some(default) if default.exists() => MonitorConfiguration::load_from_file(&default)
                .with_context(|| format!("Invalid configuration file: {}", default.display())),
            _ => Ok(MonitorConfiguration::default()),
        },
    }
}

fn run_scan(globals: &GlobalOptions, data_dir: &PathBuf, opts: cli::ScanOptions) -> Result<()> {
    let config = load_config(opts.config_path.as_ref())?;
    let store = open_store(data_dir)?;

    let filters = if opts.process_filters.is_empty() {
        config.effective_process_filters()
    } else {
        opts.process_filters.clone()
    };
    let hash_modules = config.detection.hash_modules && !opts.no_hash;
    let mut enumerator = SystemEnumerator::new(filters, hash_modules);

    let event_log = EventLog::open(
        data_dir.join(constants::EVENT_LOG_FILE),
        config.monitor.max_log_entries,
    )?;
    let mut session = ScanSession::new(event_log);

    let summary = session
        .run_single_pass(&mut enumerator, &store.snapshot())
        .context("Scan pass failed")?;

    if globals.json_output {
        println!(
            "{}",
            output::format_pass_json(session.last_verdicts(), &summary)?
        );
    } else {
        output::format_pass_human(session.last_verdicts(), &summary, globals.quiet_mode);
    }

    Ok(())
}

fn run_monitor(
    globals: &GlobalOptions,
    data_dir: &PathBuf,
    opts: cli::MonitorOptions,
) -> Result<()> {
    let config = load_config(opts.config_path.as_ref())?;
    let store = open_store(data_dir)?;

    let interval = Duration::from_secs_f64(opts.interval.unwrap_or(config.monitor.scan_interval));
    let mut enumerator =
        SystemEnumerator::new(config.effective_process_filters(), config.detection.hash_modules);

    let event_log = EventLog::open(
        data_dir.join(constants::EVENT_LOG_FILE),
        config.monitor.max_log_entries,
    )?;
    let mut session = ScanSession::new(event_log);

    let interrupted = Arc::new(AtomicBool::new(false));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone());
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, interrupted.clone());

    monitor::run_monitor_loop(
        &mut session,
        &mut enumerator,
        &store,
        interval,
        interrupted,
        &MonitorOutput {
            json_output: globals.json_output,
            quiet_mode: globals.quiet_mode,
        },
    )
}

fn run_signatures(
    globals: &GlobalOptions,
    data_dir: &PathBuf,
    action: SignatureAction,
) -> Result<()> {
    let mut store = open_store(data_dir)?;

    match action {
        SignatureAction::List { include_inactive } => {
            let snapshot = store.snapshot();
            let records: Vec<SignatureRecord> = snapshot
                .records()
                .iter()
                .filter(|r| include_inactive || r.active)
                .cloned()
                .collect();
            if globals.json_output {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                output::format_signatures_human(&records);
            }
        }
        SignatureAction::Add {
            id,
            name,
            risk,
            category,
            severity,
            patterns,
            hashes,
            description,
        } => {
            let record = SignatureRecord {
                id: id.clone(),
                display_name: name,
                file_signatures: patterns,
                content_hashes: hashes,
                risk_level: risk,
                category,
                active: true,
                severity_score: severity,
                last_updated: chrono::Utc::now(),
                description: description.unwrap_or_default(),
                first_seen: Some(chrono::Utc::now().date_naive()),
            };
            store
                .add(record)
                .with_context(|| format!("Cannot add signature '{}'", id))?;
            if !globals.quiet_mode {
                println!("Added signature '{}'.", id);
            }
        }
        SignatureAction::Update { id, fields } => {
            store
                .update(&id, fields)
                .with_context(|| format!("Cannot update signature '{}'", id))?;
            if !globals.quiet_mode {
                println!("Updated signature '{}'.", id);
            }
        }
        SignatureAction::Remove { id } => {
            store
                .remove(&id)
                .with_context(|| format!("Cannot remove signature '{}'", id))?;
            if !globals.quiet_mode {
                println!("Removed signature '{}'.", id);
            }
        }
        SignatureAction::Toggle { id } => {
            let active = store
                .toggle_active(&id)
                .with_context(|| format!("Cannot toggle signature '{}'", id))?;
            if !globals.quiet_mode {
                println!(
                    "Signature '{}' is now {}.",
                    id,
                    if active { "active" } else { "inactive" }
                );
            }
        }
    }

    Ok(())
}

fn run_report(data_dir: &PathBuf, opts: cli::ReportOptions) -> Result<()> {
    let event_log = EventLog::open(
        data_dir.join(constants::EVENT_LOG_FILE),
        constants::MAX_LOG_ENTRIES_LIMIT,
    )?;
    let events = event_log.all();
    let report = report::generate(&events, opts.start, opts.end);

    let rendered = match opts.format {
        ReportFormat::Json => Some(report.to_json()?),
        ReportFormat::Csv => Some(report.to_csv()),
        ReportFormat::Human => None,
    };

    match (&opts.output, rendered) {
        (Some(path), Some(text)) => {
            std::fs::write(path, text)
                .with_context(|| format!("Cannot write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        (Some(path), None) => {
            // Human format goes to stdout only; writing it to a file would
            // bake in console layout
            anyhow::bail!(
                "--output requires --format json or csv (refusing to write console layout to {})",
                path.display()
            );
        }
        (None, Some(text)) => println!("{}", text),
        (None, None) => output::format_report_human(&report),
    }

    Ok(())
}
