//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "app": { ... },
//!   "reports": { "trendMonths": 12 },
//!   "database": { "filename": "fintrack.duckdb" }
//! }
//! ```
//! Keys this crate does not manage are kept as-is on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::Error;
use crate::services::trend::DEFAULT_TREND_MONTHS;

pub const SETTINGS_FILENAME: &str = "settings.json";
pub const DEFAULT_DB_FILENAME: &str = "fintrack.duckdb";

/// Upper bound accepted for the trend window
pub const MAX_TREND_MONTHS: u32 = 120;

/// Environment override for the data directory
pub const ENV_DIR: &str = "FINTRACK_DIR";

/// Environment override for the trend window
pub const ENV_TREND_MONTHS: &str = "FINTRACK_TREND_MONTHS";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    app: serde_json::Value,
    #[serde(default)]
    reports: ReportSettings,
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trend_months: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Months in the trailing trend of a monthly report
    pub trend_months: u32,
    /// Ledger database file name inside the data directory
    pub db_filename: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trend_months: DEFAULT_TREND_MONTHS,
            db_filename: DEFAULT_DB_FILENAME.to_string(),
        }
    }
}

fn valid_trend_months(months: u32) -> bool {
    (1..=MAX_TREND_MONTHS).contains(&months)
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
}

impl Config {
    /// Data directory: `FINTRACK_DIR` or `~/.fintrack`
    pub fn default_dir() -> Option<PathBuf> {
        match std::env::var_os(ENV_DIR) {
            Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
            _ => dirs::home_dir().map(|home| home.join(".fintrack")),
        }
    }

    /// Load config from `data_dir`, applying environment overrides
    ///
    /// A missing file yields defaults. Out-of-range values fall back to the
    /// default with a warning.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILENAME))?;
        let mut config = Config::default();

        if let Some(months) = raw.reports.trend_months {
            if valid_trend_months(months) {
                config.trend_months = months;
            } else {
                warn!(months, "ignoring out-of-range trendMonths in settings");
            }
        }
        if let Some(filename) = raw.database.filename.filter(|f| !f.trim().is_empty()) {
            config.db_filename = filename;
        }

        if let Ok(value) = std::env::var(ENV_TREND_MONTHS) {
            match value.trim().parse::<u32>() {
                Ok(months) if valid_trend_months(months) => config.trend_months = months,
                _ => warn!(value = %value, "ignoring invalid {}", ENV_TREND_MONTHS),
            }
        }

        Ok(config)
    }

    /// Change the trend window, rejecting values outside 1..=MAX_TREND_MONTHS
    pub fn set_trend_months(&mut self, months: u32) -> Result<()> {
        if !valid_trend_months(months) {
            return Err(Error::config(format!(
                "trendMonths must be between 1 and {}, got {}",
                MAX_TREND_MONTHS, months
            ))
            .into());
        }
        self.trend_months = months;
        Ok(())
    }

    pub fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILENAME)
    }

    /// Save managed keys to `data_dir`, keeping everything else in the file
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SETTINGS_FILENAME);
        let mut settings = read_settings(&path)?;

        settings.reports.trend_months = Some(self.trend_months);
        settings.database.filename = Some(self.db_filename.clone());

        std::fs::create_dir_all(data_dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
        Ok(())
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.db_filename)
    }
}
