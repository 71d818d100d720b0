//! ROADM-to-ROADM link discovery from LLDP neighbor tables

use super::device::{DeviceAccess, DeviceError, NotificationKind, ProtocolDescriptor};
use crate::datastore::{DataBroker, LogicalDatastore, TopologyTransactionExt};
use crate::links::roadm::{create_r2r_links, DegreeEnd};
use crate::mapping::{DegreeDirection, NodeMapping, PortMappingSource};
use crate::model::{Link, NetworkLayer};
use config::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Incremental LLDP neighbor table update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LldpChange {
    Added {
        if_name: String,
        remote_system: String,
        remote_interface: String,
    },
    Removed {
        if_name: String,
        remote_system: String,
        remote_interface: String,
    },
}

/// Resolve the degree owning `if_name` and the termination points it uses on the line side
fn resolve_degree_end(mapping: &NodeMapping, if_name: &str) -> Option<DegreeEnd> {
    let degree = mapping.degree_for_interface(if_name)?;
    let end = match mapping.degree_direction(degree)? {
        DegreeDirection::Bidirectional => DegreeEnd::bidirectional(&mapping.node_id, degree),
        DegreeDirection::Unidirectional => DegreeEnd::unidirectional(&mapping.node_id, degree),
    };
    Some(end)
}

pub struct R2RLinkDiscovery {
    broker: Arc<dyn DataBroker>,
    mappings: Arc<dyn PortMappingSource>,
    device: Arc<dyn DeviceAccess>,
    read_timeout: Duration,
}

impl R2RLinkDiscovery {
    pub fn new(
        broker: Arc<dyn DataBroker>,
        mappings: Arc<dyn PortMappingSource>,
        device: Arc<dyn DeviceAccess>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self {
            broker,
            mappings,
            device,
            read_timeout: config.lldp_read_timeout(),
        }
    }

    /// Read the node's LLDP table and create one R2R link pair per neighbor.
    ///
    /// Returns false when the table cannot be read or the node is isolated,
    /// otherwise whether every neighbor entry was handled.
    pub fn read_lldp(&self, node_id: &str) -> bool {
        let Some(mapping) = self.mappings.node_mapping(node_id) else {
            warn!(node = node_id, "no port mapping, skipping LLDP read");
            return false;
        };
        let revision = mapping.node_info.openroadm_version.as_str();
        let Some(protocol) = ProtocolDescriptor::for_revision(revision) else {
            warn!(node = node_id, revision, "unsupported device revision, skipping LLDP read");
            return false;
        };

        let neighbors = match self
            .device
            .read_lldp(node_id, protocol.lldp_path, self.read_timeout)
        {
            Ok(Some(table)) if !table.neighbors.is_empty() => table.neighbors,
            Ok(_) => {
                warn!(node = node_id, "LLDP neighbor list absent, node is isolated");
                return false;
            }
            Err(err @ DeviceError::Timeout { .. }) => {
                warn!(node = node_id, error = %err, "abandoning LLDP discovery");
                return false;
            }
            Err(err) => {
                warn!(node = node_id, error = %err, "LLDP read failed");
                return false;
            }
        };

        let mut success = true;
        for neighbor in &neighbors {
            let (Some(remote_system), Some(remote_interface)) =
                (&neighbor.remote_sys_name, &neighbor.remote_port_id)
            else {
                warn!(
                    node = node_id,
                    if_name = %neighbor.if_name,
                    "LLDP entry without remote system or port, skipping"
                );
                continue;
            };
            success &= self.create_r2r_link(node_id, &neighbor.if_name, remote_system, remote_interface);
        }
        info!(node = node_id, neighbors = neighbors.len(), success, "LLDP discovery done");
        success
    }

    /// Create both directed links between the local degree behind `if_name`
    /// and the remote degree behind `remote_interface`.
    ///
    /// A remote node that is not mounted yet is not a failure: its own
    /// discovery will create the pair.
    pub fn create_r2r_link(
        &self,
        node_id: &str,
        if_name: &str,
        remote_system: &str,
        remote_interface: &str,
    ) -> bool {
        if !self.device.is_mounted(remote_system) {
            warn!(
                node = node_id,
                remote = remote_system,
                "remote node not mounted yet, skipping R2R link"
            );
            return true;
        }

        let links = match self.resolve_links(node_id, if_name, remote_system, remote_interface) {
            Resolved::Links(links) => links,
            Resolved::RemoteUnknown => return true,
            Resolved::Unresolved => return false,
        };

        let mut tx = self.broker.new_transaction();
        for link in &links {
            tx.merge_link(
                LogicalDatastore::Configuration,
                NetworkLayer::OpenroadmTopology,
                link.clone(),
            );
        }
        match tx.commit() {
            Ok(()) => {
                info!(a = %links[0].id, z = %links[1].id, "R2R links created");
                true
            }
            Err(err) => {
                error!(node = node_id, error = %err, "R2R link creation not committed");
                false
            }
        }
    }

    /// Remove both directed links of a neighbor pair
    pub fn delete_r2r_link(
        &self,
        node_id: &str,
        if_name: &str,
        remote_system: &str,
        remote_interface: &str,
    ) -> bool {
        let links = match self.resolve_links(node_id, if_name, remote_system, remote_interface) {
            Resolved::Links(links) => links,
            Resolved::RemoteUnknown | Resolved::Unresolved => return false,
        };

        let mut tx = self.broker.new_transaction();
        for link in &links {
            tx.delete_link(
                LogicalDatastore::Configuration,
                NetworkLayer::OpenroadmTopology,
                &link.id,
            );
        }
        match tx.commit() {
            Ok(()) => {
                info!(a = %links[0].id, z = %links[1].id, "R2R links deleted");
                true
            }
            Err(err) => {
                error!(node = node_id, error = %err, "R2R link deletion not committed");
                false
            }
        }
    }

    /// Apply one neighbor change. Ignored for revisions that do not report
    /// LLDP changes; their links come from [`read_lldp`](Self::read_lldp).
    pub fn on_lldp_change(&self, node_id: &str, change: &LldpChange) -> bool {
        let reported = self
            .mappings
            .node_mapping(node_id)
            .and_then(|mapping| ProtocolDescriptor::for_revision(&mapping.node_info.openroadm_version))
            .is_some_and(|protocol| protocol.supports(NotificationKind::LldpNeighborChange));
        if !reported {
            warn!(node = node_id, "LLDP change from a revision without neighbor notifications, ignored");
            return false;
        }
        match change {
            LldpChange::Added {
                if_name,
                remote_system,
                remote_interface,
            } => self.create_r2r_link(node_id, if_name, remote_system, remote_interface),
            LldpChange::Removed {
                if_name,
                remote_system,
                remote_interface,
            } => self.delete_r2r_link(node_id, if_name, remote_system, remote_interface),
        }
    }

    fn resolve_links(
        &self,
        node_id: &str,
        if_name: &str,
        remote_system: &str,
        remote_interface: &str,
    ) -> Resolved {
        let Some(local) = self
            .mappings
            .node_mapping(node_id)
            .and_then(|mapping| resolve_degree_end(&mapping, if_name))
        else {
            warn!(node = node_id, if_name, "cannot resolve local degree");
            return Resolved::Unresolved;
        };

        let Some(remote_mapping) = self.mappings.node_mapping(remote_system) else {
            warn!(node = node_id, remote = remote_system, "no port mapping for remote node yet");
            return Resolved::RemoteUnknown;
        };
        let Some(remote) = resolve_degree_end(&remote_mapping, remote_interface) else {
            warn!(
                node = node_id,
                remote = remote_system,
                remote_interface,
                "cannot resolve remote degree"
            );
            return Resolved::Unresolved;
        };

        debug!(local = %local.node, remote = %remote.node, "resolved R2R ends");
        Resolved::Links(create_r2r_links(&local, &remote))
    }
}

enum Resolved {
    Links(Vec<Link>),
    RemoteUnknown,
    Unresolved,
}
