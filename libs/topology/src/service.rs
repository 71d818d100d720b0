//! Network model service
//!
//! Entry points called by the notification layer. Each mutation reads the
//! current topology, computes a shard with the pure builders and link
//! engine, stages the shard and commits. A commit rejected as conflicting is
//! recomputed from fresh reads, never replayed, because pool allocation
//! depends on the state it was computed from.
//!
//! Handlers report `Ok(true)` when the topology changed and `Ok(false)` when
//! the request was rejected or there was nothing to do; `Err` is reserved for
//! missing inputs and datastore failures.

use crate::builder::create_topology_shard;
use crate::datastore::{
    DataBroker, LogicalDatastore, ReadWriteTransaction, StoreError, TopologyObject, TopologyPath,
    TopologyTransactionExt,
};
use crate::discovery::{DeviceAccess, LldpChange, R2RLinkDiscovery};
use crate::error::{Result, TopologyError};
use crate::link_id::build_otn_link_id;
use crate::links::otn::{
    create_odtu4_links, create_otn_links, delete_otn_links, update_otn_links, xpdr_topology_node,
};
use crate::links::roadm::{create_xpdr_rdm_links, XpdrRdmRequest};
use crate::mapping::{NodeType, PortMappingSource};
use crate::model::{Link, LinkId, NetworkLayer, NodeId, OtnLinkType, TerminationPoint, TopologyShard, TpId};
use crate::pool::ClientRate;
use config::{DatastoreConfig, EngineConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const STORE: LogicalDatastore = LogicalDatastore::Configuration;

/// Both ends of an OTN service: network element and network port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtnEndpoints {
    pub node_a: String,
    pub tp_a: String,
    pub node_z: String,
    pub tp_z: String,
}

impl OtnEndpoints {
    pub fn new(node_a: &str, tp_a: &str, node_z: &str, tp_z: &str) -> Self {
        Self {
            node_a: node_a.to_string(),
            tp_a: tp_a.to_string(),
            node_z: node_z.to_string(),
            tp_z: tp_z.to_string(),
        }
    }

    /// A-to-Z and Z-to-A ids of the pair of the given type
    pub fn link_ids(&self, link_type: OtnLinkType) -> [LinkId; 2] {
        let a = xpdr_topology_node(&self.node_a, &self.tp_a);
        let z = xpdr_topology_node(&self.node_z, &self.tp_z);
        [
            build_otn_link_id(link_type, a.as_str(), &self.tp_a, z.as_str(), &self.tp_z),
            build_otn_link_id(link_type, z.as_str(), &self.tp_z, a.as_str(), &self.tp_a),
        ]
    }

    pub fn termination_points(&self) -> [(NodeId, TpId); 2] {
        [
            (xpdr_topology_node(&self.node_a, &self.tp_a), TpId::new(self.tp_a.as_str())),
            (xpdr_topology_node(&self.node_z, &self.tp_z), TpId::new(self.tp_z.as_str())),
        ]
    }
}

/// Service lifecycle notification, as far as the topology is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEvent {
    /// OTU4 line between two network ports
    Otu4(OtnEndpoints),
    /// ODU4 multiplexing layer on top of an existing OTU4 pair
    Odu4(OtnEndpoints),
    /// Client service carried in the ODU4 layer
    Client {
        endpoints: OtnEndpoints,
        rate: ClientRate,
        tributary_port: u16,
        /// First tributary slot; derived from the port number when absent
        tributary_slot: Option<u16>,
    },
}

impl ServiceEvent {
    pub fn endpoints(&self) -> &OtnEndpoints {
        match self {
            Self::Otu4(endpoints) | Self::Odu4(endpoints) => endpoints,
            Self::Client { endpoints, .. } => endpoints,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Otu4(_) => "otu4",
            Self::Odu4(_) => "odu4",
            Self::Client { .. } => "client",
        }
    }
}

pub struct NetworkModelService {
    broker: Arc<dyn DataBroker>,
    mappings: Arc<dyn PortMappingSource>,
    discovery: R2RLinkDiscovery,
    datastore: DatastoreConfig,
}

impl NetworkModelService {
    pub fn new(
        broker: Arc<dyn DataBroker>,
        mappings: Arc<dyn PortMappingSource>,
        device: Arc<dyn DeviceAccess>,
        config: &EngineConfig,
    ) -> Self {
        let discovery = R2RLinkDiscovery::new(
            Arc::clone(&broker),
            Arc::clone(&mappings),
            device,
            &config.discovery,
        );
        Self {
            broker,
            mappings,
            discovery,
            datastore: config.datastore.clone(),
        }
    }

    pub fn discovery(&self) -> &R2RLinkDiscovery {
        &self.discovery
    }

    /// Run `compute` in a fresh transaction and commit what it staged.
    ///
    /// `compute` returns whether it staged anything; nothing staged means
    /// nothing is committed. Conflicts are retried up to the configured
    /// number of times with a linear backoff.
    fn read_compute_commit<F>(&self, operation: &str, mut compute: F) -> Result<bool>
    where
        F: FnMut(&mut dyn ReadWriteTransaction) -> Result<bool>,
    {
        let attempts = self.datastore.commit_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let mut tx = self.broker.new_transaction();
            if !compute(tx.as_mut())? {
                return Ok(false);
            }
            match tx.commit() {
                Ok(()) => {
                    debug!(operation, attempt, "committed");
                    return Ok(true);
                }
                Err(StoreError::Conflict { path }) => {
                    warn!(operation, attempt, %path, "commit conflict, recomputing");
                    if attempt < attempts {
                        std::thread::sleep(self.datastore.retry_backoff() * attempt);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(TopologyError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
        })
    }

    /// Build the element's topology nodes and intra-node links and merge them.
    /// ROADMs then run LLDP discovery.
    pub fn on_device_connected(&self, node_id: &str) -> Result<bool> {
        let mapping = self
            .mappings
            .node_mapping(node_id)
            .ok_or_else(|| TopologyError::MappingNotFound {
                node: node_id.to_string(),
            })?;
        let shard = create_topology_shard(&mapping)?;
        for node in shard.nodes() {
            node.validate()?;
        }

        let layers: &[NetworkLayer] = match mapping.node_info.node_type {
            NodeType::Rdm => &[NetworkLayer::OpenroadmTopology],
            NodeType::Xpdr => &[NetworkLayer::OpenroadmTopology, NetworkLayer::OtnTopology],
        };

        self.read_compute_commit("device-connected", |tx| {
            for &layer in layers {
                for node in shard.nodes() {
                    let mut node = node.clone();
                    // a reconnect must not wipe live tributary allocations
                    for tp in &mut node.termination_points {
                        if let Some(stored) = tx.read_tp(STORE, layer, &tp.node_id, &tp.id)? {
                            tp.otn = stored.otn;
                        }
                    }
                    tx.merge_node(STORE, layer, node);
                }
            }
            for link in shard.links() {
                tx.merge_link(STORE, NetworkLayer::OpenroadmTopology, link.clone());
            }
            Ok(true)
        })?;
        info!(
            node = node_id,
            nodes = shard.nodes().len(),
            links = shard.links().len(),
            "device topology merged"
        );

        if mapping.node_info.node_type == NodeType::Rdm && !self.discovery.read_lldp(node_id) {
            info!(node = node_id, "no ROADM neighbor linked yet");
        }
        Ok(true)
    }

    /// Remove every topology node built on the element, their termination
    /// points and every link touching them
    pub fn on_device_removed(&self, node_id: &str) -> Result<bool> {
        let removed = self.read_compute_commit("device-removed", |tx| {
            let mut staged = false;
            for layer in [NetworkLayer::OpenroadmTopology, NetworkLayer::OtnTopology] {
                let objects = tx.read_layer(STORE, layer)?;
                let owned: HashSet<NodeId> = objects
                    .iter()
                    .filter_map(|(_, object)| match object {
                        TopologyObject::Node(node)
                            if node.is_supported_by(node_id) =>
                        {
                            Some(node.id.clone())
                        }
                        _ => None,
                    })
                    .collect();
                if owned.is_empty() {
                    continue;
                }

                for (path, object) in objects {
                    let doomed = match &object {
                        TopologyObject::Node(node) => owned.contains(&node.id),
                        TopologyObject::TerminationPoint(tp) => {
                            owned.contains(&tp.node_id)
                        }
                        TopologyObject::Link(link) => {
                            owned.contains(&link.source.node)
                                || owned.contains(&link.destination.node)
                        }
                    };
                    if doomed {
                        tx.delete(STORE, path);
                        staged = true;
                    }
                }
                debug!(node = node_id, %layer, nodes = owned.len(), "staged node removal");
            }
            Ok(staged)
        })?;
        info!(node = node_id, removed, "device topology removed");
        Ok(removed)
    }

    pub fn on_lldp_change(&self, node_id: &str, change: &LldpChange) -> bool {
        self.discovery.on_lldp_change(node_id, change)
    }

    /// Connect an xponder network port to an SRG add/drop port
    pub fn link_xponder_to_roadm(&self, request: &XpdrRdmRequest) -> Result<bool> {
        let links = create_xpdr_rdm_links(request);
        self.read_compute_commit("xpdr-rdm-links", |tx| {
            for link in &links {
                tx.merge_link(STORE, NetworkLayer::OpenroadmTopology, link.clone());
            }
            Ok(true)
        })
    }

    pub fn on_service_created(&self, event: &ServiceEvent) -> Result<bool> {
        let outcome = match event {
            ServiceEvent::Otu4(endpoints) => self.create_otu4(endpoints),
            ServiceEvent::Odu4(endpoints) => self.create_odu4(endpoints),
            ServiceEvent::Client {
                endpoints,
                rate,
                tributary_port,
                tributary_slot,
            } => self.update_client(endpoints, *rate, *tributary_port, *tributary_slot, false),
        }?;
        info!(service = event.name(), applied = outcome, "service created");
        Ok(outcome)
    }

    pub fn on_service_deleted(&self, event: &ServiceEvent) -> Result<bool> {
        let outcome = match event {
            ServiceEvent::Otu4(endpoints) => self.delete_otu4(endpoints),
            ServiceEvent::Odu4(endpoints) => self.delete_odu4(endpoints),
            ServiceEvent::Client {
                endpoints,
                rate,
                tributary_port,
                tributary_slot,
            } => self.update_client(endpoints, *rate, *tributary_port, *tributary_slot, true),
        }?;
        info!(service = event.name(), applied = outcome, "service deleted");
        Ok(outcome)
    }

    fn create_otu4(&self, endpoints: &OtnEndpoints) -> Result<bool> {
        let shard = create_otn_links(
            &endpoints.node_a,
            &endpoints.tp_a,
            &endpoints.node_z,
            &endpoints.tp_z,
            OtnLinkType::Otu4,
        );
        if shard.is_empty() {
            return Ok(false);
        }
        self.read_compute_commit("create-otu4", |tx| {
            let [az, _] = endpoints.link_ids(OtnLinkType::Otu4);
            if tx.read_link(STORE, NetworkLayer::OtnTopology, &az)?.is_some() {
                debug!(link = %az, "OTU4 link already present");
                return Ok(false);
            }
            stage_shard(tx, &shard);
            Ok(true)
        })
    }

    /// Remove the OTU4 pair. Refused while an ODTU4 pair is still built on it.
    fn delete_otu4(&self, endpoints: &OtnEndpoints) -> Result<bool> {
        self.read_compute_commit("delete-otu4", |tx| {
            for id in endpoints.link_ids(OtnLinkType::Odtu4) {
                if tx.read_link(STORE, NetworkLayer::OtnTopology, &id)?.is_some() {
                    warn!(link = %id, "ODTU4 layer still present, OTU4 links kept");
                    return Ok(false);
                }
            }
            let mut staged = false;
            for id in endpoints.link_ids(OtnLinkType::Otu4) {
                if tx.read_link(STORE, NetworkLayer::OtnTopology, &id)?.is_some() {
                    tx.delete_link(STORE, NetworkLayer::OtnTopology, &id);
                    staged = true;
                }
            }
            Ok(staged)
        })
    }

    fn create_odu4(&self, endpoints: &OtnEndpoints) -> Result<bool> {
        self.read_compute_commit("create-odu4", |tx| {
            let otu4 = read_link_pair(tx, endpoints, OtnLinkType::Otu4)?;
            let tps = read_end_tps(tx, endpoints)?;
            let shard = create_odtu4_links(&otu4, &tps);
            if shard.is_empty() {
                return Ok(false);
            }
            stage_shard(tx, &shard);
            Ok(true)
        })
    }

    fn delete_odu4(&self, endpoints: &OtnEndpoints) -> Result<bool> {
        self.read_compute_commit("delete-odu4", |tx| {
            let otu4 = read_link_pair(tx, endpoints, OtnLinkType::Otu4)?;
            let tps = read_end_tps(tx, endpoints)?;
            let shard = delete_otn_links(&otu4, &tps);
            if shard.is_empty() {
                return Ok(false);
            }
            stage_shard(tx, &shard);
            for id in endpoints.link_ids(OtnLinkType::Odtu4) {
                tx.delete_link(STORE, NetworkLayer::OtnTopology, &id);
            }
            Ok(true)
        })
    }

    fn update_client(
        &self,
        endpoints: &OtnEndpoints,
        rate: ClientRate,
        tributary_port: u16,
        tributary_slot: Option<u16>,
        is_deletion: bool,
    ) -> Result<bool> {
        let start_slot = tributary_slot.unwrap_or_else(|| rate.default_start_slot(tributary_port));
        let rate_name = rate.to_string();
        self.read_compute_commit("update-client", |tx| {
            let odtu4 = read_link_pair(tx, endpoints, OtnLinkType::Odtu4)?;
            let tps = read_end_tps(tx, endpoints)?;
            let shard = update_otn_links(
                &odtu4,
                &tps,
                &rate_name,
                tributary_port,
                start_slot,
                is_deletion,
            );
            if shard.is_empty() {
                return Ok(false);
            }
            stage_shard(tx, &shard);
            Ok(true)
        })
    }
}

fn read_link_pair(
    tx: &mut dyn ReadWriteTransaction,
    endpoints: &OtnEndpoints,
    link_type: OtnLinkType,
) -> Result<Vec<Link>> {
    endpoints
        .link_ids(link_type)
        .into_iter()
        .map(|id| {
            tx.read_link(STORE, NetworkLayer::OtnTopology, &id)?
                .ok_or_else(|| TopologyError::LinkNotFound {
                    link: id.to_string(),
                })
        })
        .collect()
}

fn read_end_tps(
    tx: &mut dyn ReadWriteTransaction,
    endpoints: &OtnEndpoints,
) -> Result<Vec<TerminationPoint>> {
    endpoints
        .termination_points()
        .into_iter()
        .map(|(node, tp)| {
            tx.read_tp(STORE, NetworkLayer::OtnTopology, &node, &tp)?
                .ok_or_else(|| TopologyError::TerminationPointNotFound {
                    node: node.to_string(),
                    tp: tp.to_string(),
                })
        })
        .collect()
}

/// Stage every link and termination point of a successful OTN shard
fn stage_shard(tx: &mut dyn ReadWriteTransaction, shard: &TopologyShard) {
    for link in shard.links() {
        tx.put_link(STORE, NetworkLayer::OtnTopology, link.clone());
    }
    for tp in shard.tps() {
        tx.put_tp(STORE, NetworkLayer::OtnTopology, tp.clone());
    }
}

/// Path of one OTN termination point, for callers inspecting the store
pub fn otn_tp_path(node: &str, tp: &str) -> TopologyPath {
    TopologyPath::termination_point(NetworkLayer::OtnTopology, xpdr_topology_node(node, tp), tp)
}
