//! Error types for the topology engine
//!
//! Expected conditions inside the shard builders and the link engine
//! (validation failures, pool exhaustion, neighbors not mounted yet) are not
//! errors: they surface as an empty [`crate::model::TopologyShard`]. The
//! variants below cover contract violations and failures of the surrounding
//! collaborators.

use crate::datastore::StoreError;
use crate::discovery::DeviceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Missing required parameter '{parameter}' for node '{node}'")]
    MissingParameter {
        node: String,
        parameter: &'static str,
    },

    #[error("Port mapping for node '{node}' not found")]
    MappingNotFound { node: String },

    #[error("Node '{node}' not found in topology")]
    NodeNotFound { node: String },

    #[error("Link '{link}' not found in topology")]
    LinkNotFound { link: String },

    #[error("Termination point '{tp}' not found on node '{node}'")]
    TerminationPointNotFound { node: String, tp: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Operation '{operation}' still conflicting after {attempts} commit attempts")]
    RetriesExhausted { operation: String, attempts: u32 },

    #[error("Dispatcher error: {message}")]
    Dispatcher { message: String },

    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

impl TopologyError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether retrying the same event later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. } | Self::Device(_) | Self::Store(StoreError::Conflict { .. })
        )
    }
}
