//! # Topology Engine Configuration
//!
//! Centralized configuration, defaults and logging bootstrap for the
//! topology engine.
//!
//! ## Features
//!
//! - **Engine Configuration**: discovery workers, device read timeouts,
//!   datastore commit retry policy
//! - **Defaults**: canonical values shared by the engine and its tests
//! - **Logging**: `tracing` subscriber initialisation (plain or JSON)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{EngineConfig, init_tracing};
//!
//! let config = EngineConfig::load(None).expect("configuration");
//! init_tracing(&config.logging).expect("logging");
//! ```

pub mod defaults;
pub mod engine_config;
pub mod logging;

// Re-export commonly used types
pub use engine_config::{
    load_config, DatastoreConfig, DiscoveryConfig, EngineConfig, LoggingConfig,
};
pub use logging::init_tracing;
