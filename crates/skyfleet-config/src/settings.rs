//! skyfleet.yaml settings
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below.
//!
//! ```yaml
//! terraform:
//!   exec_path: /usr/local/bin/terraform
//!   timeout_secs: 1800
//! pricing:
//!   reference_currency: CNY
//!   rates:
//!     USD: "7.2"
//! deploy:
//!   fragment_parallelism: 2
//! ```

use crate::error::{ConfigError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub terraform: TerraformSettings,
    pub pricing: PricingSettings,
    pub capacity: CapacitySettings,
    pub deploy: DeploySettings,
    /// Scenario store location, relative to the working directory
    pub state_dir: PathBuf,
    /// INI file with one section per provider
    pub credentials_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            terraform: TerraformSettings::default(),
            pricing: PricingSettings::default(),
            capacity: CapacitySettings::default(),
            deploy: DeploySettings::default(),
            state_dir: PathBuf::from(".skyfleet"),
            credentials_file: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file is a valid, all-defaults config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Configured credentials file, or `~/.skyfleet/credentials.ini`
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".skyfleet").join("credentials.ini")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    pub exec_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            exec_path: PathBuf::from("terraform"),
            timeout_secs: 1800,
        }
    }
}

impl TerraformSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub quote_timeout_secs: u64,
    pub max_in_flight: usize,
    pub cache_ttl_secs: u64,
    pub reference_currency: String,
    /// Units of the reference currency per unit of the keyed currency
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            quote_timeout_secs: 10,
            max_in_flight: 5,
            cache_ttl_secs: 3600,
            reference_currency: "CNY".to_string(),
            rates: BTreeMap::from([("USD".to_string(), dec!(7.2))]),
        }
    }
}

impl PricingSettings {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacitySettings {
    pub max_in_flight: usize,
    pub probe_timeout_secs: u64,
}

impl Default for CapacitySettings {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            probe_timeout_secs: 10,
        }
    }
}

impl CapacitySettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub auto_approve: bool,
    pub fragment_parallelism: usize,
    pub default_node_count: u32,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            auto_approve: true,
            fragment_parallelism: 1,
            default_node_count: 3,
        }
    }
}
