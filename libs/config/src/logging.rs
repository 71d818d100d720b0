//! Logging bootstrap
//!
//! `RUST_LOG` wins over the configured level when set.

use crate::engine_config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log filter '{}'", config.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to install JSON subscriber")?;
    } else {
        registry
            .with(fmt::layer())
            .try_init()
            .context("Failed to install subscriber")?;
    }

    tracing::debug!(level = %config.level, json = config.json, "logging initialised");
    Ok(())
}
