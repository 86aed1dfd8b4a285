//! Configuration types for tierio
//!
//! A storage policy suite can be described in TOML. Fields left out fall
//! back to the standard suite so an empty file is a valid configuration.
//!
//! ```toml
//! default_policy = "HOT"
//!
//! [[policies]]
//! id = 7
//! name = "HOT"
//! storage_types = ["DISK"]
//! replication_fallbacks = ["ARCHIVE"]
//! ```

use crate::error::Result;
use crate::types::{StorageType, policy_ids, policy_names};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Root configuration: the policies making up a suite
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Name of the policy applied to inodes without an explicit policy
    #[serde(default = "default_policy_name")]
    pub default_policy: String,
    /// Policy definitions
    #[serde(default = "standard_policies")]
    pub policies: Vec<PolicyConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SuiteConfig {
    /// Configuration of the built-in suite
    #[must_use]
    pub fn standard() -> Self {
        Self {
            default_policy: default_policy_name(),
            policies: standard_policies(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        debug!(
            policies = config.policies.len(),
            default_policy = %config.default_policy,
            "parsed storage policy configuration"
        );
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading storage policy configuration");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Definition of a single storage policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy id persisted with inodes (1..=15)
    pub id: u8,
    /// Display name
    pub name: String,
    /// Preferred type per replica; the last entry repeats
    pub storage_types: Vec<StorageType>,
    /// Substitutes tried in order when creating a new replica
    #[serde(default)]
    pub creation_fallbacks: Vec<StorageType>,
    /// Substitutes tried in order when re-replicating
    #[serde(default)]
    pub replication_fallbacks: Vec<StorageType>,
    /// Write to the first (transient) tier and copy to persistent storage
    #[serde(default)]
    pub copy_on_create_file: bool,
}

impl PolicyConfig {
    fn new(
        id: u8,
        name: &str,
        storage_types: &[StorageType],
        creation_fallbacks: &[StorageType],
        replication_fallbacks: &[StorageType],
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            storage_types: storage_types.to_vec(),
            creation_fallbacks: creation_fallbacks.to_vec(),
            replication_fallbacks: replication_fallbacks.to_vec(),
            copy_on_create_file: false,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_policy_name() -> String {
    policy_names::HOT.to_string()
}

fn standard_policies() -> Vec<PolicyConfig> {
    use StorageType::{Archive, Disk, Provided, RamDisk, Ssd};

    let mut lazy_persist = PolicyConfig::new(
        policy_ids::LAZY_PERSIST,
        policy_names::LAZY_PERSIST,
        &[RamDisk, Disk],
        &[Disk],
        &[Disk],
    );
    lazy_persist.copy_on_create_file = true;

    vec![
        lazy_persist,
        PolicyConfig::new(policy_ids::ALL_SSD, policy_names::ALL_SSD, &[Ssd], &[Disk], &[Disk]),
        PolicyConfig::new(
            policy_ids::ONE_SSD,
            policy_names::ONE_SSD,
            &[Ssd, Disk],
            &[Ssd, Disk],
            &[Ssd, Disk],
        ),
        PolicyConfig::new(policy_ids::HOT, policy_names::HOT, &[Disk], &[], &[Archive]),
        PolicyConfig::new(
            policy_ids::WARM,
            policy_names::WARM,
            &[Disk, Archive],
            &[Disk, Archive],
            &[Disk, Archive],
        ),
        PolicyConfig::new(policy_ids::COLD, policy_names::COLD, &[Archive], &[], &[]),
        PolicyConfig::new(
            policy_ids::PROVIDED,
            policy_names::PROVIDED,
            &[Provided, Disk],
            &[Provided, Disk],
            &[Provided, Disk],
        ),
    ]
}
