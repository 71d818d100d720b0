//! Default configuration values
//!
//! Constants used across the engine for consistency. Values that operators
//! can tune are mirrored in [`crate::EngineConfig`].

/// Discovery defaults
pub mod discovery {
    /// LLDP / inventory read timeout (milliseconds)
    pub const LLDP_READ_TIMEOUT_MS: u64 = 10_000;

    /// Number of event workers
    pub const WORKER_COUNT: usize = 4;

    /// Per-worker event queue depth
    pub const QUEUE_DEPTH: usize = 256;
}

/// Datastore defaults
pub mod datastore {
    /// Commit attempts after the first one when a transaction conflicts
    pub const COMMIT_RETRIES: u32 = 3;

    /// Linear backoff step between conflicting commits (milliseconds)
    pub const RETRY_BACKOFF_MS: u64 = 10;
}

/// Logging defaults
pub mod logging {
    /// Filter directive used when `RUST_LOG` is not set
    pub const LEVEL: &str = "info";
}

/// Environment variable prefix for overrides, e.g. `TOPOLOGY_DISCOVERY__WORKER_COUNT`
pub const ENV_PREFIX: &str = "TOPOLOGY";

/// Default configuration file location
pub const CONFIG_PATH: &str = "config/topology.toml";
