//! Global constants for modscan
//!
//! Centralized location for application-wide constants

/// File name of the signature database inside the data directory
pub const SIGNATURE_DB_FILE: &str = "signatures.json";

/// File name of the persisted event log inside the data directory
pub const EVENT_LOG_FILE: &str = "events.json";

/// Signature database envelope format version
pub const SIGNATURE_DB_VERSION: &str = "1.0";

/// Default number of events retained before FIFO eviction
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 1000;

/// Default interval between monitor passes, in seconds
pub const DEFAULT_SCAN_INTERVAL_SECS: f64 = 5.0;

/// Bounds for the configurable scan interval, in seconds.
/// Note: bounds must match the validation error text in config.rs
pub const SCAN_INTERVAL_MIN: f64 = 0.1;
pub const SCAN_INTERVAL_MAX: f64 = 300.0;

/// Upper bound for the configurable event log size
pub const MAX_LOG_ENTRIES_LIMIT: usize = 100_000;

/// Process names the system enumerator watches when no filters are configured
pub const DEFAULT_PROCESS_FILTERS: &[&str] = &["minecraft", "javaw", "java"];

/// Default per-process module enumeration timeout, in milliseconds
pub const DEFAULT_ENUMERATION_TIMEOUT_MS: u64 = 2000;
