//! Configuration for the asset ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot file backing the DAG
    pub snapshot_path: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Snapshot configuration
    pub storage: StorageConfig,

    /// Writer actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./data/asset_dag.json"),
            service_name: "asset-dag".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Indent the JSON snapshot
    pub pretty: bool,

    /// Create missing parent directories on write
    pub create_dirs: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            create_dirs: true,
        }
    }
}

/// Writer actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
        }
    }
}

impl Config {
    /// Config for a snapshot at `path`, defaults elsewhere
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: path.into(),
            ..Self::default()
        }
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(path) = std::env::var("ASSET_DAG_SNAPSHOT_PATH") {
            config.snapshot_path = PathBuf::from(path);
        }

        if let Ok(pretty) = std::env::var("ASSET_DAG_PRETTY_SNAPSHOTS") {
            config.storage.pretty = pretty.parse().map_err(|_| {
                crate::Error::Config(format!("ASSET_DAG_PRETTY_SNAPSHOTS: not a bool: {}", pretty))
            })?;
        }

        if let Ok(capacity) = std::env::var("ASSET_DAG_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!("ASSET_DAG_MAILBOX_CAPACITY: not a number: {}", capacity))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(crate::Error::Config("snapshot_path is empty".to_string()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
