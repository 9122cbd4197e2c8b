//! Configuration management
//!
//! Settings live in `settings.json` inside the ledger directory:
//! ```json
//! {
//!   "ledger": { "dbFile": "ledger.duckdb", "transferTimeoutMs": 5000 }
//! }
//! ```
//! Keys this crate does not manage are kept intact when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default database file name inside the ledger directory
pub const DEFAULT_DB_FILE: &str = "ledger.duckdb";

/// Default bound on a single transfer's unit of work
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5000;

const ENV_TRANSFER_TIMEOUT_MS: &str = "LEDGERLINE_TRANSFER_TIMEOUT_MS";
const ENV_DB_FILE: &str = "LEDGERLINE_DB_FILE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    db_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_timeout_ms: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Ledgerline configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub db_file: String,
    /// 0 disables the timeout
    pub transfer_timeout_ms: u64,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_file: DEFAULT_DB_FILE.to_string(),
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the ledger directory
    ///
    /// Environment variables win over the settings file:
    /// - `LEDGERLINE_TRANSFER_TIMEOUT_MS` (0 disables the timeout)
    /// - `LEDGERLINE_DB_FILE`
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        let settings_path = ledger_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        Self::from_settings(
            raw,
            std::env::var(ENV_TRANSFER_TIMEOUT_MS).ok().as_deref(),
            std::env::var(ENV_DB_FILE).ok().as_deref(),
        )
    }

    fn from_settings(
        raw: SettingsFile,
        timeout_override: Option<&str>,
        db_file_override: Option<&str>,
    ) -> Result<Self> {
        let transfer_timeout_ms = match timeout_override {
            Some(value) => value.trim().parse::<u64>().with_context(|| {
                format!("{} must be a whole number of milliseconds", ENV_TRANSFER_TIMEOUT_MS)
            })?,
            None => raw
                .ledger
                .transfer_timeout_ms
                .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_MS),
        };

        let db_file = db_file_override
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .or_else(|| raw.ledger.db_file.clone())
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());

        Ok(Self {
            db_file,
            transfer_timeout_ms,
            _raw_settings: raw,
        })
    }

    /// Save config to the ledger directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, ledger_dir: &Path) -> Result<()> {
        let settings_path = ledger_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        // Update only the fields we manage
        settings.ledger.db_file = Some(self.db_file.clone());
        settings.ledger.transfer_timeout_ms = Some(self.transfer_timeout_ms);

        std::fs::create_dir_all(ledger_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Full path of the database file
    pub fn db_path(&self, ledger_dir: &Path) -> PathBuf {
        ledger_dir.join(&self.db_file)
    }

    /// Timeout applied to each transfer, `None` when disabled
    pub fn transfer_timeout(&self) -> Option<Duration> {
        match self.transfer_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn set_transfer_timeout_ms(&mut self, ms: u64) {
        self.transfer_timeout_ms = ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let config = Config::from_settings(SettingsFile::default(), None, None).unwrap();
        assert_eq!(config.db_file, DEFAULT_DB_FILE);
        assert_eq!(config.transfer_timeout(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_env_overrides_win() {
        let raw: SettingsFile =
            serde_json::from_str(r#"{"ledger": {"dbFile": "a.duckdb", "transferTimeoutMs": 100}}"#)
                .unwrap();

        let config = Config::from_settings(raw.clone(), Some("0"), Some("b.duckdb")).unwrap();
        assert_eq!(config.db_file, "b.duckdb");
        assert_eq!(config.transfer_timeout(), None);

        let from_file = Config::from_settings(raw, None, None).unwrap();
        assert_eq!(from_file.db_file, "a.duckdb");
        assert_eq!(from_file.transfer_timeout_ms, 100);
    }

    #[test]
    fn test_bad_timeout_override_is_an_error() {
        assert!(Config::from_settings(SettingsFile::default(), Some("soon"), None).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme": "dark", "ledger": {"dbFile": "x.duckdb", "region": "eu"}}"#,
        )
        .unwrap();

        let raw: SettingsFile = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        let mut config = Config::from_settings(raw, None, None).unwrap();
        config.set_transfer_timeout_ms(250);
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["ledger"]["region"], "eu");
        assert_eq!(saved["ledger"]["dbFile"], "x.duckdb");
        assert_eq!(saved["ledger"]["transferTimeoutMs"], 250);
    }
}
