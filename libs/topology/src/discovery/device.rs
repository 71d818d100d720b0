//! Device access contract and per-revision protocol descriptors

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Read from device '{node}' timed out after {timeout_ms}ms")]
    Timeout { node: String, timeout_ms: u64 },

    #[error("Device '{node}' unreachable: {message}")]
    Unreachable { node: String, message: String },
}

/// One entry of a device's LLDP neighbor table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpNeighbor {
    /// Local interface the neighbor was seen on
    pub if_name: String,
    pub remote_sys_name: Option<String>,
    pub remote_port_id: Option<String>,
}

impl LldpNeighbor {
    pub fn new(if_name: &str, remote_sys_name: &str, remote_port_id: &str) -> Self {
        Self {
            if_name: if_name.to_string(),
            remote_sys_name: Some(remote_sys_name.to_string()),
            remote_port_id: Some(remote_port_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LldpNeighbors {
    pub neighbors: Vec<LldpNeighbor>,
}

/// Mount-point access to managed devices.
///
/// Reads return `Ok(None)` when the requested subtree does not exist.
pub trait DeviceAccess: Send + Sync {
    fn is_mounted(&self, node_id: &str) -> bool;

    fn read_lldp(
        &self,
        node_id: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Option<LldpNeighbors>, DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    DeviceChange,
    LldpNeighborChange,
    Alarm,
}

/// What differs between device model revisions, as far as discovery cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub revision: &'static str,
    pub lldp_path: &'static str,
    pub notifications: &'static [NotificationKind],
}

impl ProtocolDescriptor {
    pub fn supports(&self, kind: NotificationKind) -> bool {
        self.notifications.contains(&kind)
    }

    pub fn for_revision(revision: &str) -> Option<&'static ProtocolDescriptor> {
        PROTOCOLS.iter().find(|protocol| protocol.revision == revision)
    }
}

const LLDP_NBR_LIST: &str = "/org-openroadm-device/protocols/lldp/nbr-list";

pub static PROTOCOLS: [ProtocolDescriptor; 3] = [
    ProtocolDescriptor {
        revision: "1.2.1",
        lldp_path: LLDP_NBR_LIST,
        notifications: &[NotificationKind::DeviceChange, NotificationKind::Alarm],
    },
    ProtocolDescriptor {
        revision: "2.2.1",
        lldp_path: LLDP_NBR_LIST,
        notifications: &[
            NotificationKind::DeviceChange,
            NotificationKind::LldpNeighborChange,
            NotificationKind::Alarm,
        ],
    },
    ProtocolDescriptor {
        revision: "7.1",
        lldp_path: LLDP_NBR_LIST,
        notifications: &[
            NotificationKind::DeviceChange,
            NotificationKind::LldpNeighborChange,
            NotificationKind::Alarm,
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_lookup() {
        let legacy = ProtocolDescriptor::for_revision("1.2.1").unwrap();
        assert!(!legacy.supports(NotificationKind::LldpNeighborChange));
        assert!(ProtocolDescriptor::for_revision("7.1")
            .unwrap()
            .supports(NotificationKind::LldpNeighborChange));
        assert!(ProtocolDescriptor::for_revision("13.1").is_none());
    }
}
