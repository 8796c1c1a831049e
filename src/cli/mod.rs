//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - `scan` for one-shot passes
//! - `monitor` for continuous scanning
//! - `signatures` for database management
//! - `report` for event log aggregation and export
//! - Output format selection (human/JSON) and quiet mode

use crate::constants::{SCAN_INTERVAL_MAX, SCAN_INTERVAL_MIN};
use crate::models::{Category, RiskLevel, SignatureUpdate};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Directory holding signatures.json and events.json
    pub data_dir: Option<PathBuf>,
    pub json_output: bool,
    pub quiet_mode: bool,
}

/// Parsed subcommand
#[derive(Debug, Clone)]
pub enum CliCommand {
    Scan(ScanOptions),
    Monitor(MonitorOptions),
    Signatures(SignatureAction),
    Report(ReportOptions),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub config_path: Option<PathBuf>,
    /// Extra process name filters; empty = config/builtin defaults
    pub process_filters: Vec<String>,
    pub no_hash: bool,
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub config_path: Option<PathBuf>,
    /// Overrides the configured scan interval when set
    pub interval: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum SignatureAction {
    List {
        include_inactive: bool,
    },
    Add {
        id: String,
        name: String,
        risk: RiskLevel,
        category: Category,
        severity: f64,
        patterns: Vec<String>,
        hashes: Vec<String>,
        description: Option<String>,
    },
    Update {
        id: String,
        fields: SignatureUpdate,
    },
    Remove {
        id: String,
    },
    Toggle {
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Json,
    Csv,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub format: ReportFormat,
    /// Write to this file instead of stdout
    pub output: Option<PathBuf>,
}

/// Build the clap command tree
pub fn build_cli() -> Command {
    Command::new("modscan")
        .version(env!("MODSCAN_VERSION"))
        .about("Signature-based detection of cheat client modules in game processes")
        .long_about(
            "Scans running game processes for loaded modules matching a local \
             signature database of known cheat clients, by content hash or \
             filename pattern.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory for the signature database and event log")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print detected threats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Run a single scan pass over matching processes")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file (TOML)"),
                )
                .arg(
                    Arg::new("filter")
                        .short('f')
                        .long("filter")
                        .value_name("NAME")
                        .help("Process name substring to scan (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("no-hash")
                        .long("no-hash")
                        .help("Skip content hashing, filename matching only")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("monitor")
                .about("Scan continuously until interrupted (Ctrl-C)")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file (TOML)"),
                )
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Seconds between scan passes (0.1-300.0)"),
                ),
        )
        .subcommand(
            Command::new("signatures")
                .about("Manage the signature database")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("list").about("List signatures").arg(
                        Arg::new("all")
                            .short('a')
                            .long("all")
                            .help("Include inactive signatures")
                            .action(ArgAction::SetTrue),
                    ),
                )
                .subcommand(
                    Command::new("add")
                        .about("Add a new signature")
                        .arg(Arg::new("id").required(true).help("Unique signature id"))
                        .arg(
                            Arg::new("name")
                                .short('n')
                                .long("name")
                                .value_name("NAME")
                                .required(true)
                                .help("Display name of the cheat client"),
                        )
                        .arg(
                            Arg::new("risk")
                                .short('r')
                                .long("risk")
                                .value_name("LEVEL")
                                .default_value("dangerous")
                                .help("Risk level: safe, suspicious, dangerous"),
                        )
                        .arg(
                            Arg::new("category")
                                .long("category")
                                .value_name("CATEGORY")
                                .default_value("hack")
                                .help("Category: system, game, utility, hack, unknown"),
                        )
                        .arg(
                            Arg::new("severity")
                                .short('s')
                                .long("severity")
                                .value_name("SCORE")
                                .default_value("5.0")
                                .help("Severity score (0.0-10.0)"),
                        )
                        .arg(
                            Arg::new("pattern")
                                .short('p')
                                .long("pattern")
                                .value_name("SUBSTRING")
                                .help("Filename substring to match (repeatable)")
                                .action(ArgAction::Append),
                        )
                        .arg(
                            Arg::new("hash")
                                .long("hash")
                                .value_name("SHA256")
                                .help("Known content hash (repeatable)")
                                .action(ArgAction::Append),
                        )
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .value_name("TEXT")
                                .help("Free-form description"),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .about("Modify fields of an existing signature")
                        .arg(Arg::new("id").required(true).help("Signature id"))
                        .arg(
                            Arg::new("name")
                                .short('n')
                                .long("name")
                                .value_name("NAME")
                                .help("New display name"),
                        )
                        .arg(
                            Arg::new("risk")
                                .short('r')
                                .long("risk")
                                .value_name("LEVEL")
                                .help("New risk level: safe, suspicious, dangerous"),
                        )
                        .arg(
                            Arg::new("category")
                                .long("category")
                                .value_name("CATEGORY")
                                .help("New category: system, game, utility, hack, unknown"),
                        )
                        .arg(
                            Arg::new("severity")
                                .short('s')
                                .long("severity")
                                .value_name("SCORE")
                                .help("New severity score (0.0-10.0)"),
                        )
                        .arg(
                            Arg::new("pattern")
                                .short('p')
                                .long("pattern")
                                .value_name("SUBSTRING")
                                .help("Replacement filename patterns (repeatable)")
                                .action(ArgAction::Append),
                        )
                        .arg(
                            Arg::new("hash")
                                .long("hash")
                                .value_name("SHA256")
                                .help("Replacement content hashes (repeatable)")
                                .action(ArgAction::Append),
                        )
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .value_name("TEXT")
                                .help("New description"),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove a signature")
                        .arg(Arg::new("id").required(true).help("Signature id")),
                )
                .subcommand(
                    Command::new("toggle")
                        .about("Flip a signature's active flag")
                        .arg(Arg::new("id").required(true).help("Signature id")),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Aggregate the event log into a threat report")
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("DATE")
                        .help("Inclusive start date (YYYY-MM-DD)"),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .value_name("DATE")
                        .help("Inclusive end date (YYYY-MM-DD)"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .default_value("human")
                        .help("Output format: human, json, csv"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Write the report to a file instead of stdout"),
                ),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<(GlobalOptions, CliCommand)> {
    let matches = build_cli().get_matches();
    parse_matches(&matches)
}

fn parse_matches(matches: &ArgMatches) -> Result<(GlobalOptions, CliCommand)> {
    let globals = GlobalOptions {
        data_dir: matches.get_one::<String>("data-dir").map(PathBuf::from),
        json_output: matches.get_flag("json"),
        quiet_mode: matches.get_flag("quiet"),
    };

    let command = match matches.subcommand() {
        Some(("scan", sub)) => CliCommand::Scan(ScanOptions {
            config_path: sub.get_one::<String>("config").map(PathBuf::from),
            process_filters: sub
                .get_many::<String>("filter")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            no_hash: sub.get_flag("no-hash"),
        }),
        Some(("monitor", sub)) => {
            let interval = sub
                .get_one::<String>("interval")
                .map(|raw| parse_interval(raw))
                .transpose()?;
            CliCommand::Monitor(MonitorOptions {
                config_path: sub.get_one::<String>("config").map(PathBuf::from),
                interval,
            })
        }
        Some(("signatures", sub)) => CliCommand::Signatures(parse_signature_action(sub)?),
        Some(("report", sub)) => CliCommand::Report(ReportOptions {
            start: sub
                .get_one::<String>("start")
                .map(|raw| parse_date(raw))
                .transpose()?,
            end: sub
                .get_one::<String>("end")
                .map(|raw| parse_date(raw))
                .transpose()?,
            format: parse_report_format(
                sub.get_one::<String>("format").map(String::as_str).unwrap_or("human"),
            )?,
            output: sub.get_one::<String>("output").map(PathBuf::from),
        }),
        _ => unreachable!("subcommand_required is set"),
    };

    Ok((globals, command))
}

fn parse_signature_action(matches: &ArgMatches) -> Result<SignatureAction> {
    match matches.subcommand() {
        Some(("list", sub)) => Ok(SignatureAction::List {
            include_inactive: sub.get_flag("all"),
        }),
        Some(("add", sub)) => {
            let severity_raw = sub.get_one::<String>("severity").expect("has default");
            let severity: f64 = severity_raw
                .parse()
                .map_err(|_| anyhow!("Invalid severity score: {}", severity_raw))?;

            Ok(SignatureAction::Add {
                id: sub.get_one::<String>("id").expect("required").clone(),
                name: sub.get_one::<String>("name").expect("required").clone(),
                risk: parse_risk_level(sub.get_one::<String>("risk").expect("has default"))?,
                category: parse_category(sub.get_one::<String>("category").expect("has default"))?,
                severity,
                patterns: sub
                    .get_many::<String>("pattern")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                hashes: sub
                    .get_many::<String>("hash")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                description: sub.get_one::<String>("description").cloned(),
            })
        }
        Some(("update", sub)) => {
            let severity = sub
                .get_one::<String>("severity")
                .map(|raw| {
                    raw.parse::<f64>()
                        .map_err(|_| anyhow!("Invalid severity score: {}", raw))
                })
                .transpose()?;

            Ok(SignatureAction::Update {
                id: sub.get_one::<String>("id").expect("required").clone(),
                fields: SignatureUpdate {
                    display_name: sub.get_one::<String>("name").cloned(),
                    file_signatures: sub
                        .get_many::<String>("pattern")
                        .map(|values| values.cloned().collect()),
                    content_hashes: sub
                        .get_many::<String>("hash")
                        .map(|values| values.cloned().collect()),
                    risk_level: sub
                        .get_one::<String>("risk")
                        .map(|raw| parse_risk_level(raw))
                        .transpose()?,
                    category: sub
                        .get_one::<String>("category")
                        .map(|raw| parse_category(raw))
                        .transpose()?,
                    severity_score: severity,
                    description: sub.get_one::<String>("description").cloned(),
                },
            })
        }
        Some(("remove", sub)) => Ok(SignatureAction::Remove {
            id: sub.get_one::<String>("id").expect("required").clone(),
        }),
        Some(("toggle", sub)) => Ok(SignatureAction::Toggle {
            id: sub.get_one::<String>("id").expect("required").clone(),
        }),
        _ => unreachable!("subcommand_required is set"),
    }
}

fn parse_risk_level(raw: &str) -> Result<RiskLevel> {
    match raw.to_lowercase().as_str() {
        "safe" => Ok(RiskLevel::Safe),
        "suspicious" => Ok(RiskLevel::Suspicious),
        "dangerous" => Ok(RiskLevel::Dangerous),
        other => Err(anyhow!(
            "Invalid risk level '{}': expected safe, suspicious, or dangerous",
            other
        )),
    }
}

fn parse_category(raw: &str) -> Result<Category> {
    match raw.to_lowercase().as_str() {
        "system" => Ok(Category::System),
        "game" => Ok(Category::Game),
        "utility" => Ok(Category::Utility),
        "hack" => Ok(Category::Hack),
        "unknown" => Ok(Category::Unknown),
        other => Err(anyhow!(
            "Invalid category '{}': expected system, game, utility, hack, or unknown",
            other
        )),
    }
}

fn parse_report_format(raw: &str) -> Result<ReportFormat> {
    match raw.to_lowercase().as_str() {
        "human" => Ok(ReportFormat::Human),
        "json" => Ok(ReportFormat::Json),
        "csv" => Ok(ReportFormat::Csv),
        other => Err(anyhow!(
            "Invalid report format '{}': expected human, json, or csv",
            other
        )),
    }
}

fn parse_interval(raw: &str) -> Result<f64> {
    let interval: f64 = raw
        .parse()
        .map_err(|_| anyhow!("Invalid interval: {}", raw))?;
    if !(SCAN_INTERVAL_MIN..=SCAN_INTERVAL_MAX).contains(&interval) {
        return Err(anyhow!(
            "Interval must be between {} and {} seconds",
            SCAN_INTERVAL_MIN,
            SCAN_INTERVAL_MAX
        ));
    }
    Ok(interval)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date '{}': expected YYYY-MM-DD", raw))
}
