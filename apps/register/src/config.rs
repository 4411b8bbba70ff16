//! # Register Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KIOSKO_CHANNEL_ID=ch-02                                            │
//! │     KIOSKO_DB_PATH=/srv/kiosko/kiosko.db                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kiosko-pos/register.toml (Linux)                         │
//! │     ~/Library/Application Support/com.kiosko.pos/register.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Kiosko Miraflores"
//! currency_symbol = "S/"
//! currency_decimals = 2
//!
//! [register]
//! channel_id = "ch-01"
//! operator = "mquispe"
//!
//! [database]
//! path = "/srv/kiosko/kiosko.db"
//! max_connections = 5
//!
//! [checkout]
//! commit_timeout_ms = 10000
//! require_confirmation_code = false
//! vat_rate_bps = 1800
//! default_stock_type_id = "sellable"
//! search_limit = 20
//!
//! [logging]
//! filter = "info,kiosko=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use kiosko_core::validation::validate_tax_rate_bps;
use kiosko_core::TaxRate;

/// Errors loading or validating `register.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// The store this register belongs to, as printed on receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Money is kept in hundredths; only 2 is accepted.
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u8,
}

fn default_store_name() -> String {
    "Kiosko".to_string()
}

fn default_currency_symbol() -> String {
    "S/".to_string()
}

fn default_currency_decimals() -> u8 {
    2
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            currency_decimals: default_currency_decimals(),
        }
    }
}

/// Which channel this process drives, and who is at the till.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSettings {
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    #[serde(default)]
    pub operator: Option<String>,
}

fn default_channel_id() -> String {
    "ch-01".to_string()
}

impl Default for RegisterSettings {
    fn default() -> Self {
        RegisterSettings {
            channel_id: default_channel_id(),
            operator: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `None` means `kiosko.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Order commit and payment rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Upper bound for one commit transaction.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,

    /// Reject non-cash payments that carry no confirmation code.
    #[serde(default)]
    pub require_confirmation_code: bool,

    #[serde(default = "default_vat_rate_bps")]
    pub vat_rate_bps: u32,

    #[serde(default = "default_stock_type_id")]
    pub default_stock_type_id: String,

    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_commit_timeout_ms() -> u64 {
    10_000
}

fn default_vat_rate_bps() -> u32 {
    kiosko_core::DEFAULT_VAT_RATE_BPS
}

fn default_stock_type_id() -> String {
    "sellable".to_string()
}

fn default_search_limit() -> u32 {
    20
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            commit_timeout_ms: default_commit_timeout_ms(),
            require_confirmation_code: false,
            vat_rate_bps: default_vat_rate_bps(),
            default_stock_type_id: default_stock_type_id(),
            search_limit: default_search_limit(),
        }
    }
}

impl CheckoutSettings {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn vat_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.vat_rate_bps)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,kiosko=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Register Configuration
// =============================================================================

/// Complete register configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub register: RegisterSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl RegisterConfig {
    /// Loads defaults, then the TOML file (explicit path or the platform
    /// default), then `KIOSKO_*` environment overrides, and validates.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.register.channel_id.trim().is_empty() {
            return Err(ConfigError::Invalid("register.channel_id is required".into()));
        }
        if self.store.currency_decimals != 2 {
            return Err(ConfigError::Invalid(format!(
                "store.currency_decimals must be 2, got {}",
                self.store.currency_decimals
            )));
        }
        if self.checkout.commit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "checkout.commit_timeout_ms must be greater than 0".into(),
            ));
        }
        validate_tax_rate_bps(self.checkout.vat_rate_bps)
            .map_err(|e| ConfigError::Invalid(format!("checkout.{}", e)))?;
        if self.checkout.default_stock_type_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "checkout.default_stock_type_id is required".into(),
            ));
        }
        if self.checkout.search_limit == 0 {
            return Err(ConfigError::Invalid(
                "checkout.search_limit must be greater than 0".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `KIOSKO_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("KIOSKO_CHANNEL_ID") {
            debug!(channel_id = %id, "Overriding channel from environment");
            self.register.channel_id = id;
        }

        if let Some(operator) = lookup("KIOSKO_OPERATOR") {
            self.register.operator = Some(operator);
        }

        if let Some(name) = lookup("KIOSKO_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(path) = lookup("KIOSKO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(ms) = lookup("KIOSKO_COMMIT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.checkout.commit_timeout_ms = ms;
        }

        if let Some(flag) = lookup("KIOSKO_REQUIRE_CONFIRMATION_CODE") {
            self.checkout.require_confirmation_code =
                matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(filter) = lookup("KIOSKO_LOG") {
            self.logging.filter = filter;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kiosko", "pos")
            .map(|dirs| dirs.config_dir().join("register.toml"))
    }

    /// The configured database file, or `kiosko.db` in the platform data
    /// directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "kiosko", "pos").ok_or_else(|| {
            ConfigError::Invalid("could not determine the app data directory".into())
        })?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("kiosko.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegisterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checkout.vat_rate_bps, 1800);
        assert!(!config.checkout.require_confirmation_code);
        assert_eq!(config.checkout.commit_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RegisterConfig::from_toml(
            r#"
            [register]
            channel_id = "ch-07"

            [checkout]
            require_confirmation_code = true
            "#,
        )
        .unwrap();

        assert_eq!(config.register.channel_id, "ch-07");
        assert!(config.checkout.require_confirmation_code);
        assert_eq!(config.checkout.search_limit, 20);
        assert_eq!(config.store.currency_symbol, "S/");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = RegisterConfig::from_toml("[store]\ncurrency_decimals = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RegisterConfig::from_toml("[checkout]\ncommit_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RegisterConfig::from_toml("[checkout]\nvat_rate_bps = 10001\n").unwrap_err();
        match err {
            ConfigError::Invalid(message) => assert!(message.contains("vat_rate_bps")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(RegisterConfig::from_toml("[checkout]\nvat_rate_bps = 0\n").is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KIOSKO_CHANNEL_ID", "ch-02"),
            ("KIOSKO_DB_PATH", "/tmp/k.db"),
            ("KIOSKO_COMMIT_TIMEOUT_MS", "2500"),
            ("KIOSKO_REQUIRE_CONFIRMATION_CODE", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = RegisterConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.register.channel_id, "ch-02");
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/k.db")));
        assert_eq!(config.checkout.commit_timeout_ms, 2500);
        assert!(config.checkout.require_confirmation_code);
    }

    #[test]
    fn test_unparseable_timeout_override_is_ignored() {
        let mut config = RegisterConfig::default();
        config.apply_overrides(|key| {
            (key == "KIOSKO_COMMIT_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(config.checkout.commit_timeout_ms, 10_000);
    }
}
