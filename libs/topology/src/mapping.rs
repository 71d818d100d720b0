//! Port-mapping inventory
//!
//! Read-only per-node table linking logical connection points (LCPs such as
//! `DEG1-TTP-TXRX`, `SRG1-PP1-TXRX` or `XPDR1-NETWORK1`) to circuit packs and
//! ports, with degree/SRG/xponder numbering encoded in the LCP name. The
//! inventory is maintained by an external collaborator; the engine only reads
//! it through [`PortMappingSource`].

use crate::model::InterfaceCapability;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Rdm,
    Xpdr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    Tx,
    Rx,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortQualifier {
    RoadmExternal,
    RoadmInternal,
    XpdrNetwork,
    XpdrClient,
    SwitchNetwork,
    SwitchClient,
}

impl PortQualifier {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::XpdrNetwork | Self::SwitchNetwork)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::XpdrClient | Self::SwitchClient)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XpdrNodeType {
    Tpdr,
    Mpdr,
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_type: NodeType,
    /// Site code; mandatory for ROADMs
    pub clli: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    /// Device model revision, e.g. `2.2.1`
    pub openroadm_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub logical_connection_point: String,
    pub supporting_circuit_pack_name: String,
    pub supporting_port: String,
    pub port_direction: PortDirection,
    pub port_qualifier: Option<PortQualifier>,
    pub partner_lcp: Option<String>,
    /// Client/network pairing for transponders
    pub connection_map_lcp: Option<String>,
    pub xponder_type: Option<XpdrNodeType>,
    pub supported_interface_capability: Vec<InterfaceCapability>,
}

impl Mapping {
    pub fn new(lcp: &str, circuit_pack: &str, port: &str, direction: PortDirection) -> Self {
        Self {
            logical_connection_point: lcp.to_string(),
            supporting_circuit_pack_name: circuit_pack.to_string(),
            supporting_port: port.to_string(),
            port_direction: direction,
            port_qualifier: None,
            partner_lcp: None,
            connection_map_lcp: None,
            xponder_type: None,
            supported_interface_capability: Vec::new(),
        }
    }

    pub fn group(&self) -> Option<LcpGroup> {
        LcpGroup::parse(&self.logical_connection_point)
    }
}

/// Circuit pack hosting the LLDP-speaking interface of a degree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpToDegree {
    pub circuit_pack_name: String,
    pub degree_number: u16,
    pub interface_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonBlockingListLcp {
    pub nbl_number: u16,
    pub interconnect_bandwidth_mbps: Option<u32>,
    pub lcps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingPoolLcp {
    pub switching_pool_number: u16,
    pub non_blocking_lists: Vec<NonBlockingListLcp>,
}

/// Inventory snapshot of one network element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMapping {
    pub node_id: String,
    pub node_info: NodeInfo,
    pub mappings: Vec<Mapping>,
    pub cp_to_degree: Vec<CpToDegree>,
    pub switching_pool_lcp: Vec<SwitchingPoolLcp>,
}

/// Degree direction derived from the number of degree mappings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeDirection {
    /// One TXRX port
    Bidirectional,
    /// Separate TX and RX ports
    Unidirectional,
}

impl NodeMapping {
    pub fn mapping(&self, lcp: &str) -> Option<&Mapping> {
        self.mappings
            .iter()
            .find(|mapping| mapping.logical_connection_point == lcp)
    }

    /// Degree hosting the interface `if_name`
    pub fn degree_for_interface(&self, if_name: &str) -> Option<u16> {
        self.cp_to_degree
            .iter()
            .find(|entry| entry.interface_name == if_name)
            .map(|entry| entry.degree_number)
    }

    pub fn degree_mappings(&self, degree: u16) -> impl Iterator<Item = &Mapping> {
        self.mappings
            .iter()
            .filter(move |mapping| mapping.group() == Some(LcpGroup::Degree(degree)))
    }

    /// `None` when the degree has no mapping at all
    pub fn degree_direction(&self, degree: u16) -> Option<DegreeDirection> {
        match self.degree_mappings(degree).count() {
            0 => None,
            1 => Some(DegreeDirection::Bidirectional),
            _ => Some(DegreeDirection::Unidirectional),
        }
    }
}

/// Group a logical connection point belongs to, from its name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LcpGroup {
    Degree(u16),
    Srg(u16),
    Xponder(u16),
}

impl LcpGroup {
    pub fn parse(lcp: &str) -> Option<Self> {
        let prefix = lcp.split('-').next()?;
        if let Some(number) = prefix.strip_prefix("DEG") {
            return number.parse().ok().map(Self::Degree);
        }
        if let Some(number) = prefix.strip_prefix("SRG") {
            return number.parse().ok().map(Self::Srg);
        }
        if let Some(number) = prefix.strip_prefix("XPDR") {
            return number.parse().ok().map(Self::Xponder);
        }
        None
    }
}

/// Access to the port-mapping inventory
pub trait PortMappingSource: Send + Sync {
    fn node_mapping(&self, node_id: &str) -> Option<NodeMapping>;
}

/// Inventory held in memory, keyed by node id
#[derive(Debug, Default)]
pub struct InMemoryPortMapping {
    nodes: DashMap<String, NodeMapping>,
}

impl InMemoryPortMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mapping: NodeMapping) {
        self.nodes.insert(mapping.node_id.clone(), mapping);
    }

    pub fn remove(&self, node_id: &str) -> Option<NodeMapping> {
        self.nodes.remove(node_id).map(|(_, mapping)| mapping)
    }
}

impl PortMappingSource for InMemoryPortMapping {
    fn node_mapping(&self, node_id: &str) -> Option<NodeMapping> {
        self.nodes.get(node_id).map(|entry| entry.value().clone())
    }
}
