//! Engine Configuration Module
//!
//! Provides configuration loading for the topology engine.
//! Supports loading from TOML files with environment variable overrides.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main engine configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EngineConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Neighbor discovery and event dispatch
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Datastore transaction policy
    #[serde(default)]
    pub datastore: DatastoreConfig,
}

/// Logging settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Discovery settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Upper bound for a single device read
    pub lldp_read_timeout_ms: u64,
    /// Number of event workers; events for one node always land on the same worker
    pub worker_count: usize,
    /// Bounded queue depth per worker
    pub queue_depth: usize,
}

/// Datastore settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatastoreConfig {
    pub commit_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            lldp_read_timeout_ms: defaults::discovery::LLDP_READ_TIMEOUT_MS,
            worker_count: defaults::discovery::WORKER_COUNT,
            queue_depth: defaults::discovery::QUEUE_DEPTH,
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            commit_retries: defaults::datastore::COMMIT_RETRIES,
            retry_backoff_ms: defaults::datastore::RETRY_BACKOFF_MS,
        }
    }
}

impl DiscoveryConfig {
    pub fn lldp_read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lldp_read_timeout_ms)
    }
}

impl DatastoreConfig {
    pub fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_backoff_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file with `TOPOLOGY_` environment overrides.
    ///
    /// Without an explicit path the default location is tried and may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(path) => {
                info!("Loading engine config: {:?}", path);
                File::from(path).required(true)
            }
            None => {
                debug!("Loading engine config from default location {}", defaults::CONFIG_PATH);
                File::from(Path::new(defaults::CONFIG_PATH)).required(false)
            }
        };

        let config = Config::builder()
            .add_source(source)
            .add_source(
                Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: EngineConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.discovery.worker_count == 0 {
            bail!("discovery.worker_count must be at least 1");
        }
        if self.discovery.queue_depth == 0 {
            bail!("discovery.queue_depth must be at least 1");
        }
        if self.discovery.lldp_read_timeout_ms == 0 {
            bail!("discovery.lldp_read_timeout_ms must be positive");
        }
        Ok(())
    }
}

/// Convenience function to load configuration from the default location
pub fn load_config() -> Result<EngineConfig> {
    EngineConfig::load(None)
}
