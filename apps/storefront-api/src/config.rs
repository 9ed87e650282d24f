//! # Storefront Configuration
//!
//! Server, database, pricing and lifecycle settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     EMPORIUM_PORT=9090                                                 │
//! │     EMPORIUM_DATABASE_PATH=/var/lib/emporium/store.db                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/emporium/storefront.toml (Linux)                         │
//! │     ~/Library/Application Support/dev.emporium.emporium/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8080, ./emporium.db, 18% tax                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8080
//!
//! [database]
//! path = "emporium.db"
//! max_connections = 5
//!
//! [pricing]
//! tax_rate_bps = 1800       # 18.00%
//! standard_fee = 10000      # paise
//! standard_free_above = 100000
//! express_fee = 25000
//! pickup_fee = 0
//!
//! [lifecycle]
//! max_payment_retries = 3
//! max_conflict_retries = 3
//!
//! [effects]
//! max_attempts = 3
//! initial_backoff_ms = 100
//! max_backoff_ms = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use emporium_core::pricing::{ShippingRate, ShippingRateTable};
use emporium_core::validation::validate_tax_rate_bps;
use emporium_core::{LifecycleConfig, Money, PricingConfig, TaxRate};
use emporium_db::DbConfig;

// =============================================================================
// Config Error
// =============================================================================

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
// Server Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` gives a throwaway database.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("emporium.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    pub fn to_db_config(&self) -> DbConfig {
        if self.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(self.path.clone()).max_connections(self.max_connections)
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Tax and shipping rules, all amounts in paise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Tax rate in basis points (1800 = 18%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    #[serde(default = "default_standard_fee")]
    pub standard_fee: i64,

    /// Net subtotal at which standard shipping becomes free. Omit to never
    /// waive the fee.
    #[serde(default = "default_standard_free_above")]
    pub standard_free_above: Option<i64>,

    #[serde(default = "default_express_fee")]
    pub express_fee: i64,

    #[serde(default)]
    pub pickup_fee: i64,
}

fn default_tax_rate_bps() -> u32 {
    emporium_core::pricing::DEFAULT_TAX_RATE_BPS
}

fn default_standard_fee() -> i64 {
    10_000
}

fn default_standard_free_above() -> Option<i64> {
    Some(100_000)
}

fn default_express_fee() -> i64 {
    25_000
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate_bps: default_tax_rate_bps(),
            standard_fee: default_standard_fee(),
            standard_free_above: default_standard_free_above(),
            express_fee: default_express_fee(),
            pickup_fee: 0,
        }
    }
}

impl PricingSettings {
    pub fn to_pricing_config(&self) -> PricingConfig {
        PricingConfig {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            shipping: ShippingRateTable {
                standard: ShippingRate {
                    fee: Money::from_minor(self.standard_fee),
                    free_above: self.standard_free_above.map(Money::from_minor),
                },
                express: ShippingRate {
                    fee: Money::from_minor(self.express_fee),
                    free_above: None,
                },
                store_pickup: ShippingRate {
                    fee: Money::from_minor(self.pickup_fee),
                    free_above: None,
                },
            },
        }
    }
}

// =============================================================================
// Lifecycle Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// RetryPayment transitions allowed per order.
    #[serde(default = "default_max_payment_retries")]
    pub max_payment_retries: u32,

    /// Re-fetch/reapply attempts after losing an optimistic version race.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_max_payment_retries() -> u32 {
    emporium_core::DEFAULT_MAX_PAYMENT_RETRIES
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        LifecycleSettings {
            max_payment_retries: default_max_payment_retries(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl LifecycleSettings {
    pub fn to_lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            max_payment_retries: self.max_payment_retries,
        }
    }
}

// =============================================================================
// Effect Dispatch Settings
// =============================================================================

/// Retry policy for executing declared effects against collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectSettings {
    /// Attempts per effect, including the first. Minimum 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

impl Default for EffectSettings {
    fn default() -> Self {
        EffectSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl EffectSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,

    #[serde(default)]
    pub effects: EffectSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else if explicit {
                return Err(ConfigError::Invalid(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind_addr must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_tax_rate_bps(self.pricing.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(format!("pricing.{}", e)))?;

        let fees = [
            ("pricing.standard_fee", self.pricing.standard_fee),
            ("pricing.express_fee", self.pricing.express_fee),
            ("pricing.pickup_fee", self.pricing.pickup_fee),
        ];
        for (name, fee) in fees {
            if fee < 0 {
                return Err(ConfigError::Invalid(format!("{} must not be negative", name)));
            }
        }
        if matches!(self.pricing.standard_free_above, Some(t) if t < 0) {
            return Err(ConfigError::Invalid(
                "pricing.standard_free_above must not be negative".into(),
            ));
        }

        if self.effects.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "effects.max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("EMPORIUM_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(port) = std::env::var("EMPORIUM_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid EMPORIUM_PORT"),
            }
        }

        if let Ok(path) = std::env::var("EMPORIUM_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(bps) = std::env::var("EMPORIUM_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(b) => self.pricing.tax_rate_bps = b,
                Err(_) => warn!(value = %bps, "Ignoring invalid EMPORIUM_TAX_RATE_BPS"),
            }
        }

        if let Ok(retries) = std::env::var("EMPORIUM_MAX_PAYMENT_RETRIES") {
            match retries.parse::<u32>() {
                Ok(r) => self.lifecycle.max_payment_retries = r,
                Err(_) => {
                    warn!(value = %retries, "Ignoring invalid EMPORIUM_MAX_PAYMENT_RETRIES")
                }
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "emporium", "emporium")
            .map(|dirs| dirs.config_dir().join("storefront.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.pricing.to_pricing_config(), PricingConfig::default());
        assert_eq!(
            config.lifecycle.to_lifecycle_config(),
            LifecycleConfig::default()
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9090

            [pricing]
            tax_rate_bps = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.pricing.tax_rate_bps, 500);
        assert_eq!(config.pricing.standard_fee, 10_000);
        assert_eq!(config.lifecycle.max_conflict_retries, 3);
    }

    #[test]
    fn test_pricing_settings_map_to_engine_config() {
        let settings = PricingSettings {
            tax_rate_bps: 1200,
            standard_fee: 5_000,
            standard_free_above: None,
            express_fee: 20_000,
            pickup_fee: 0,
        };
        let pricing = settings.to_pricing_config();

        assert_eq!(pricing.tax_rate.bps(), 1200);
        assert_eq!(pricing.shipping.standard.fee.minor(), 5_000);
        assert_eq!(pricing.shipping.standard.free_above, None);
        assert_eq!(pricing.shipping.express.fee.minor(), 20_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.pricing.express_fee = -1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.pricing.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.effects.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = AppConfig::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = AppConfig::load(Some(PathBuf::from("/nonexistent/storefront.toml")));
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_in_memory_database_path() {
        let settings = DatabaseSettings {
            path: PathBuf::from(":memory:"),
            max_connections: 8,
        };
        assert_eq!(settings.to_db_config().max_connections, 1);
    }
}
