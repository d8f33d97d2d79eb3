//! # Configuration
//!
//! Configuration for the database pool and the inventory rules.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEDISTOCK_DB_PATH=/var/lib/medistock/medistock.db                  │
//! │     MEDISTOCK_EXPIRY_WARNING_DAYS=45                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/medistock/medistock.toml (Linux)                         │
//! │     ~/Library/Application Support/com.medistock.medistock/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # medistock.toml
//! [database]
//! path = "/var/lib/medistock/medistock.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [inventory]
//! expiry_warning_days = 30
//! default_min_batch_stock = 5
//! invoice_prefix = "INV"
//! invoice_retry_attempts = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use medistock_core::{DEFAULT_EXPIRY_WARNING_DAYS, DEFAULT_INVOICE_PREFIX, DEFAULT_MIN_BATCH_STOCK_LEVEL};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `medistock.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a writer waits for the SQLite write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// The configured path or the platform default.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "medistock", "medistock")
                .map(|dirs| dirs.data_dir().join("medistock.db"))
                .unwrap_or_else(|| PathBuf::from("medistock.db"))
        })
    }
}

// =============================================================================
// Inventory Settings
// =============================================================================

/// `[inventory]` section: allocation, alert and invoice rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Batches expiring within this many days carry an `ExpiringSoon` warning.
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: i64,

    /// Per-batch low-stock threshold for products that leave it unset.
    #[serde(default = "default_min_batch_stock")]
    pub default_min_batch_stock: i64,

    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    /// Attempts at a fresh invoice number before giving up.
    #[serde(default = "default_invoice_retry_attempts")]
    pub invoice_retry_attempts: u32,
}

fn default_expiry_warning_days() -> i64 {
    DEFAULT_EXPIRY_WARNING_DAYS
}

fn default_min_batch_stock() -> i64 {
    DEFAULT_MIN_BATCH_STOCK_LEVEL
}

fn default_invoice_prefix() -> String {
    DEFAULT_INVOICE_PREFIX.to_string()
}

fn default_invoice_retry_attempts() -> u32 {
    5
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            expiry_warning_days: default_expiry_warning_days(),
            default_min_batch_stock: default_min_batch_stock(),
            invoice_prefix: default_invoice_prefix(),
            invoice_retry_attempts: default_invoice_retry_attempts(),
        }
    }
}

// =============================================================================
// MediStock Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediStockConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl MediStockConfig {
    /// Loads configuration: defaults, then file, then environment.
    ///
    /// `config_path` falls back to `medistock.toml` in the platform config
    /// directory. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading MediStock config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load MediStock config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "MediStock config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        let inv = &self.inventory;
        if inv.expiry_warning_days < 0 {
            return Err(ConfigError::Invalid(
                "inventory.expiry_warning_days must not be negative".into(),
            ));
        }
        if inv.default_min_batch_stock < 0 {
            return Err(ConfigError::Invalid(
                "inventory.default_min_batch_stock must not be negative".into(),
            ));
        }
        if inv.invoice_prefix.trim().is_empty()
            || !inv.invoice_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid(format!(
                "inventory.invoice_prefix must be alphanumeric, got '{}'",
                inv.invoice_prefix
            )));
        }
        if inv.invoice_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "inventory.invoice_retry_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies `MEDISTOCK_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MEDISTOCK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("MEDISTOCK_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %max, "Ignoring invalid MEDISTOCK_MAX_CONNECTIONS"),
            }
        }

        if let Some(days) = lookup("MEDISTOCK_EXPIRY_WARNING_DAYS") {
            match days.parse() {
                Ok(days) => self.inventory.expiry_warning_days = days,
                Err(_) => warn!(value = %days, "Ignoring invalid MEDISTOCK_EXPIRY_WARNING_DAYS"),
            }
        }

        if let Some(level) = lookup("MEDISTOCK_DEFAULT_MIN_BATCH_STOCK") {
            match level.parse() {
                Ok(level) => self.inventory.default_min_batch_stock = level,
                Err(_) => warn!(value = %level, "Ignoring invalid MEDISTOCK_DEFAULT_MIN_BATCH_STOCK"),
            }
        }

        if let Some(prefix) = lookup("MEDISTOCK_INVOICE_PREFIX") {
            self.inventory.invoice_prefix = prefix;
        }

        if let Some(attempts) = lookup("MEDISTOCK_INVOICE_RETRY_ATTEMPTS") {
            match attempts.parse() {
                Ok(attempts) => self.inventory.invoice_retry_attempts = attempts,
                Err(_) => {
                    warn!(value = %attempts, "Ignoring invalid MEDISTOCK_INVOICE_RETRY_ATTEMPTS")
                }
            }
        }
    }

    /// Returns the default config file path for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "medistock", "medistock")
            .map(|dirs| dirs.config_dir().join("medistock.toml"))
    }

    /// Pool settings as a [`DbConfig`].
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig::new(db.resolved_path())
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .busy_timeout(Duration::from_secs(db.busy_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = MediStockConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inventory.expiry_warning_days, 30);
        assert_eq!(config.inventory.default_min_batch_stock, 5);
        assert_eq!(config.inventory.invoice_prefix, "INV");
        assert_eq!(config.inventory.invoice_retry_attempts, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MediStockConfig::from_toml(
            r#"
            [inventory]
            expiry_warning_days = 45
            "#,
        )
        .unwrap();
        assert_eq!(config.inventory.expiry_warning_days, 45);
        assert_eq!(config.inventory.invoice_prefix, "INV");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MEDISTOCK_DB_PATH", "/tmp/ms.db"),
            ("MEDISTOCK_EXPIRY_WARNING_DAYS", "60"),
            ("MEDISTOCK_INVOICE_RETRY_ATTEMPTS", "not-a-number"),
            ("MEDISTOCK_INVOICE_PREFIX", "RX"),
        ]
        .into_iter()
        .collect();

        let mut config = MediStockConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/ms.db")));
        assert_eq!(config.inventory.expiry_warning_days, 60);
        assert_eq!(config.inventory.invoice_retry_attempts, 5);
        assert_eq!(config.inventory.invoice_prefix, "RX");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MediStockConfig::default();
        config.inventory.invoice_retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = MediStockConfig::default();
        config.inventory.invoice_prefix = "INV-".to_string();
        assert!(config.validate().is_err());

        let mut config = MediStockConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_db_config_from_settings() {
        let mut config = MediStockConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/ms.db"));
        config.database.busy_timeout_secs = 9;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/ms.db"));
        assert_eq!(db.busy_timeout, Duration::from_secs(9));
    }
}
