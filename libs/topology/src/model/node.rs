//! Topology nodes and their supporting-layer references

use super::termination_point::TerminationPoint;
use super::{NodeId, TpId};
use crate::error::{Result, TopologyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network layers a node can be supported by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetworkLayer {
    /// Site / CLLI layer
    Clli,
    /// Physical-inventory layer, one node per network element
    OpenroadmNetwork,
    /// ROADM topology layer (degrees, SRGs, xponders)
    OpenroadmTopology,
    /// OTN topology layer (xponders and OTN links)
    OtnTopology,
}

impl NetworkLayer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clli => "clli-network",
            Self::OpenroadmNetwork => "openroadm-network",
            Self::OpenroadmTopology => "openroadm-topology",
            Self::OtnTopology => "otn-topology",
        }
    }
}

impl fmt::Display for NetworkLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Back-reference to the node this one is built on in a lower layer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupportingNode {
    pub network: NetworkLayer,
    pub node_ref: String,
}

/// One group of termination points that can cross-connect without blocking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonBlockingList {
    pub nbl_number: u16,
    pub interconnect_bandwidth_mbps: Option<u32>,
    pub tps: Vec<TpId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OduSwitchingPool {
    pub switching_pool_number: u16,
    pub non_blocking_lists: Vec<NonBlockingList>,
}

/// Switching capabilities of an OTN-capable xponder
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwitchingPools {
    pub odu_switching_pools: Vec<OduSwitchingPool>,
}

impl SwitchingPools {
    pub fn non_blocking_lists(&self) -> impl Iterator<Item = &NonBlockingList> {
        self.odu_switching_pools
            .iter()
            .flat_map(|pool| pool.non_blocking_lists.iter())
    }
}

/// Role of a topology node. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Degree { degree_number: u16 },
    Srg { srg_number: u16 },
    /// Point-to-point transponder, clients paired 1:1 with networks
    Transponder { xpdr_number: u16 },
    Muxponder {
        xpdr_number: u16,
        switching_pools: SwitchingPools,
    },
    Switch {
        xpdr_number: u16,
        switching_pools: SwitchingPools,
    },
}

impl NodeRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Degree { .. } => "DEGREE",
            Self::Srg { .. } => "SRG",
            Self::Transponder { .. } => "TPDR",
            Self::Muxponder { .. } => "MUXPDR",
            Self::Switch { .. } => "SWITCH",
        }
    }

    pub fn is_roadm(&self) -> bool {
        matches!(self, Self::Degree { .. } | Self::Srg { .. })
    }

    pub fn switching_pools(&self) -> Option<&SwitchingPools> {
        match self {
            Self::Muxponder {
                switching_pools, ..
            }
            | Self::Switch {
                switching_pools, ..
            } => Some(switching_pools),
            _ => None,
        }
    }
}

/// Topology node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    role: NodeRole,
    pub termination_points: Vec<TerminationPoint>,
    pub supporting_nodes: Vec<SupportingNode>,
}

impl Node {
    /// Create a node with no termination points or supporting nodes
    pub fn new(id: impl Into<NodeId>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            role,
            termination_points: Vec::new(),
            supporting_nodes: Vec::new(),
        }
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    /// Add a supporting node, replacing any previous reference in the same layer
    pub fn with_supporting_node(mut self, network: NetworkLayer, node_ref: impl Into<String>) -> Self {
        self.set_supporting_node(network, node_ref);
        self
    }

    pub fn set_supporting_node(&mut self, network: NetworkLayer, node_ref: impl Into<String>) {
        let node_ref = node_ref.into();
        match self
            .supporting_nodes
            .iter_mut()
            .find(|supporting| supporting.network == network)
        {
            Some(existing) => existing.node_ref = node_ref,
            None => self.supporting_nodes.push(SupportingNode { network, node_ref }),
        }
        self.supporting_nodes.sort();
    }

    /// Set termination points, sorted and deduplicated by id (first wins)
    pub fn with_termination_points(mut self, mut tps: Vec<TerminationPoint>) -> Self {
        tps.sort_by(|a, b| a.id.cmp(&b.id));
        tps.dedup_by(|later, earlier| later.id == earlier.id);
        self.termination_points = tps;
        self
    }

    pub fn supporting_node(&self, network: NetworkLayer) -> Option<&SupportingNode> {
        self.supporting_nodes
            .iter()
            .find(|supporting| supporting.network == network)
    }

    pub fn termination_point(&self, tp_id: &str) -> Option<&TerminationPoint> {
        self.termination_points.iter().find(|tp| tp.id == tp_id)
    }

    /// Whether this node is built on top of the given network element
    pub fn is_supported_by(&self, network_element: &str) -> bool {
        self.supporting_node(NetworkLayer::OpenroadmNetwork)
            .is_some_and(|supporting| supporting.node_ref == network_element)
    }

    /// Merge a freshly built copy of this node into the stored one.
    ///
    /// Supporting layers and termination points are extended; the role is kept.
    pub fn merge_from(&mut self, other: Node) {
        if other.role != self.role {
            tracing::warn!(
                node = %self.id,
                stored = self.role.name(),
                incoming = other.role.name(),
                "ignoring role change on merge"
            );
        }
        for supporting in other.supporting_nodes {
            self.set_supporting_node(supporting.network, supporting.node_ref);
        }
        for tp in other.termination_points {
            match self.termination_points.iter_mut().find(|existing| existing.id == tp.id) {
                Some(existing) => *existing = tp,
                None => self.termination_points.push(tp),
            }
        }
        self.termination_points.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Validate node invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(TopologyError::validation("Node id cannot be empty"));
        }

        if self.supporting_nodes.is_empty() {
            return Err(TopologyError::validation(format!(
                "Node {} has no supporting node",
                self.id
            )));
        }

        for pair in self.supporting_nodes.windows(2) {
            if pair[0].network == pair[1].network {
                return Err(TopologyError::validation(format!(
                    "Node {} has two supporting nodes in layer {}",
                    self.id, pair[0].network
                )));
            }
        }

        for pair in self.termination_points.windows(2) {
            if pair[0].id >= pair[1].id {
                return Err(TopologyError::validation(format!(
                    "Node {} termination points not sorted/unique at {}",
                    self.id, pair[1].id
                )));
            }
        }

        Ok(())
    }
}
