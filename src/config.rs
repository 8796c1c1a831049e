//! Configuration management for monitor mode
//!
//! Handles TOML configuration parsing, validation, and defaults

use crate::constants::{
    DEFAULT_MAX_LOG_ENTRIES, DEFAULT_PROCESS_FILTERS, DEFAULT_SCAN_INTERVAL_SECS,
    MAX_LOG_ENTRIES_LIMIT, SCAN_INTERVAL_MAX, SCAN_INTERVAL_MIN,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors, kept distinct from I/O so callers can report
/// invalid values without hiding them behind a generic failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Main monitor configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfiguration {
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub detection: DetectionSettings,
}

/// Core monitoring runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Scan interval in seconds (0.1-300.0)
    #[serde(default = "default_scan_interval")]
    pub scan_interval: f64,
    /// Maximum retained event log entries
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
}

/// Detection behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Process name substrings to watch (empty = built-in defaults)
    #[serde(default)]
    pub process_filters: Vec<String>,
    /// Whether to content-hash observed modules for exact matching
    #[serde(default = "default_hash_modules")]
    pub hash_modules: bool,
}

fn default_scan_interval() -> f64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_max_log_entries() -> usize {
    DEFAULT_MAX_LOG_ENTRIES
}

fn default_hash_modules() -> bool {
    true
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL_SECS,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            process_filters: Vec::new(),
            hash_modules: true,
        }
    }
}

impl Default for MonitorConfiguration {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings::default(),
            detection: DetectionSettings::default(),
        }
    }
}

impl MonitorConfiguration {
    /// Parse and validate a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `<config dir>/modscan/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modscan").join("config.toml"))
    }

    /// Effective process filters, falling back to the built-in defaults
    pub fn effective_process_filters(&self) -> Vec<String> {
        if self.detection.process_filters.is_empty() {
            DEFAULT_PROCESS_FILTERS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.detection.process_filters.clone()
        }
    }

    /// Reject out-of-bounds values before they reach the scanner
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.monitor.scan_interval;
        if !interval.is_finite() || !(SCAN_INTERVAL_MIN..=SCAN_INTERVAL_MAX).contains(&interval) {
            return Err(ConfigError::Invalid(format!(
                "scan_interval must be between {} and {} seconds, got {}",
                SCAN_INTERVAL_MIN, SCAN_INTERVAL_MAX, interval
            )));
        }

        if self.monitor.max_log_entries == 0 || self.monitor.max_log_entries > MAX_LOG_ENTRIES_LIMIT
        {
            return Err(ConfigError::Invalid(format!(
                "max_log_entries must be between 1 and {}, got {}",
                MAX_LOG_ENTRIES_LIMIT, self.monitor.max_log_entries
            )));
        }

        if self
            .detection
            .process_filters
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "process_filters must not contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}
