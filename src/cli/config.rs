//! Arisan operator configuration file handling
//!
//! Provides default configuration generation and loading for the `arisan`
//! operator CLI. Configuration files are TOML.
//!
//! ## Operator vs Group Configuration
//!
//! This file holds OPERATOR settings only: the platform wallet and capacity
//! pricing, where the snapshot lives, and logging.
//!
//! Group parameters (title, commission, prize, contribution, coordinator)
//! live in the group state and change only through approved proposals. The
//! operator cannot edit them here.

use super::amount::{parse_amount, AmountError};
use arisan::capacity::CapacityPolicy;
use arisan::identity::Address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default price of one capacity tier
const DEFAULT_UPGRADE_COST: &str = "0.01eth";

/// Operator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArisanConfig {
    /// Platform wallet and capacity pricing
    #[serde(default)]
    pub platform: PlatformSection,

    /// Snapshot location
    #[serde(default)]
    pub store: StoreSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Platform settings applied by `init-platform`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSection {
    /// Wallet receiving platform fees and upgrade payments (0x hex)
    pub wallet: Option<String>,

    /// Price of one capacity upgrade (e.g. "0.01eth", "5000000gwei")
    #[serde(default = "default_upgrade_cost")]
    pub capacity_upgrade_cost: String,

    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: u32,

    #[serde(default = "default_tier_step")]
    pub tier_step: u32,

    #[serde(default = "default_ceiling")]
    pub ceiling: u32,
}

/// Snapshot store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_upgrade_cost() -> String {
    DEFAULT_UPGRADE_COST.to_string()
}

fn default_initial_capacity() -> u32 {
    10
}

fn default_tier_step() -> u32 {
    10
}

fn default_ceiling() -> u32 {
    100
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            wallet: None,
            capacity_upgrade_cost: default_upgrade_cost(),
            initial_capacity: default_initial_capacity(),
            tier_step: default_tier_step(),
            ceiling: default_ceiling(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl PlatformSection {
    /// Capacity policy described by this section.
    pub fn capacity_policy(&self) -> Result<CapacityPolicy, AmountError> {
        Ok(CapacityPolicy {
            initial_capacity: self.initial_capacity,
            tier_step: self.tier_step,
            ceiling: self.ceiling,
            upgrade_cost: parse_amount(&self.capacity_upgrade_cost)?,
        })
    }

    /// Configured platform wallet, if any.
    pub fn wallet_address(&self) -> Result<Option<Address>, Box<dyn std::error::Error>> {
        match &self.wallet {
            Some(wallet) => Ok(Some(wallet.parse().map_err(|e| {
                format!("Invalid platform wallet '{}': {}", wallet, e)
            })?)),
            None => Ok(None),
        }
    }
}

impl ArisanConfig {
    /// Configuration with the given snapshot path
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store: StoreSection { path: store_path },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: ArisanConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(store_path: &Path) -> String {
        format!(
            r#"# Arisan Operator Configuration
#
# OPERATOR settings only. Group parameters (title, commission, prize,
# contribution, coordinator) change only through approved proposals.

[platform]
# Wallet receiving platform fees and capacity upgrade payments.
# Required before `arisan init-platform` unless passed with --wallet.
# wallet = "0x..."

# Exact price of one capacity upgrade ("0.01eth", "10000000gwei", "1000")
capacity_upgrade_cost = "{cost}"

# Member ceiling of a new group, members added per upgrade, hard ceiling
initial_capacity = 10
tier_step = 10
ceiling = 100

[store]
# CBOR snapshot of the platform and every group
path = "{store_path}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/arisan/arisan.log"
"#,
            cost = DEFAULT_UPGRADE_COST,
            store_path = store_path.display()
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        store_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(store_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arisan")
}

/// Default config file path: `<data_dir>/arisan/config.toml`
pub fn default_config_path() -> PathBuf {
    data_root().join("config.toml")
}

/// Default snapshot path: `<data_dir>/arisan/state.cbor`
pub fn default_store_path() -> PathBuf {
    data_root().join("state.cbor")
}
