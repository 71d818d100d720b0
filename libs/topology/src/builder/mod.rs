//! Topology shard builders
//!
//! Turn one network element's port-mapping snapshot into topology nodes,
//! termination points and intra-node links. Node roles are decided here and
//! nowhere else.

pub mod roadm;
pub mod xpdr;

pub use roadm::create_topology_shard_for_roadm;
pub use xpdr::create_topology_shard_for_xpdr;

use crate::error::Result;
use crate::mapping::{NodeMapping, NodeType};
use crate::model::TopologyShard;

/// Build the shard matching the element's declared node type
pub fn create_topology_shard(mapping: &NodeMapping) -> Result<TopologyShard> {
    match mapping.node_info.node_type {
        NodeType::Rdm => create_topology_shard_for_roadm(mapping),
        NodeType::Xpdr => create_topology_shard_for_xpdr(mapping),
    }
}
