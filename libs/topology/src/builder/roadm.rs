//! ROADM shard: one node per degree, one per SRG, plus express and add/drop links

use crate::error::{Result, TopologyError};
use crate::links::roadm::{add_drop_links, degree_ctp, degree_node_id, express_links, srg_cp, srg_node_id};
use crate::mapping::{LcpGroup, Mapping, NodeMapping, PortDirection};
use crate::model::{
    NetworkLayer, Node, NodeId, NodeRole, TerminationPoint, TopologyShard, TpDirection, TpType,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

fn tp_direction(direction: PortDirection) -> TpDirection {
    match direction {
        PortDirection::Tx => TpDirection::Tx,
        PortDirection::Rx => TpDirection::Rx,
        PortDirection::Bidirectional => TpDirection::TxRx,
    }
}

/// Build degree and SRG nodes with their express and add/drop links.
///
/// The site code (CLLI) is a hard precondition: without it the nodes cannot
/// be anchored in the site layer and the call fails.
pub fn create_topology_shard_for_roadm(mapping: &NodeMapping) -> Result<TopologyShard> {
    let node_id = mapping.node_id.as_str();
    let clli = mapping
        .node_info
        .clli
        .as_deref()
        .filter(|clli| !clli.is_empty())
        .ok_or_else(|| TopologyError::MissingParameter {
            node: node_id.to_string(),
            parameter: "clli",
        })?;

    let mut degrees: BTreeMap<u16, Vec<&Mapping>> = BTreeMap::new();
    let mut srgs: BTreeMap<u16, Vec<&Mapping>> = BTreeMap::new();
    for entry in &mapping.mappings {
        match entry.group() {
            Some(LcpGroup::Degree(number)) => degrees.entry(number).or_default().push(entry),
            Some(LcpGroup::Srg(number)) => srgs.entry(number).or_default().push(entry),
            _ => debug!(
                node = node_id,
                lcp = %entry.logical_connection_point,
                "skipping non-ROADM mapping"
            ),
        }
    }

    let mut nodes = Vec::with_capacity(degrees.len() + srgs.len());
    for (&degree, entries) in &degrees {
        nodes.push(create_degree(node_id, clli, degree, entries));
    }
    for (&srg, entries) in &srgs {
        nodes.push(create_srg(node_id, clli, srg, entries));
    }

    let degree_numbers: Vec<u16> = degrees.keys().copied().collect();
    let srg_numbers: Vec<u16> = srgs.keys().copied().collect();
    let mut links = express_links(node_id, &degree_numbers);
    links.extend(add_drop_links(node_id, &degree_numbers, &srg_numbers));

    debug!(
        node = node_id,
        degrees = degree_numbers.len(),
        srgs = srg_numbers.len(),
        links = links.len(),
        "built ROADM shard"
    );
    Ok(TopologyShard::default().with_nodes(nodes).with_links(links))
}

fn roadm_node(node_id: &str, clli: &str, topology_id: NodeId, role: NodeRole) -> Node {
    Node::new(topology_id, role)
        .with_supporting_node(NetworkLayer::Clli, clli)
        .with_supporting_node(NetworkLayer::OpenroadmNetwork, node_id)
}

fn create_degree(node_id: &str, clli: &str, degree: u16, entries: &[&Mapping]) -> Node {
    let topology_id = degree_node_id(node_id, degree);
    let mut tps: Vec<TerminationPoint> = entries
        .iter()
        .filter(|entry| entry.logical_connection_point.contains("-TTP-"))
        .map(|entry| {
            let direction = tp_direction(entry.port_direction);
            let tp = TerminationPoint::new(
                topology_id.clone(),
                entry.logical_connection_point.as_str(),
                TpType::degree_ttp(direction),
                direction,
            );
            match &entry.partner_lcp {
                Some(partner) => tp.with_associated_tp(partner.as_str()),
                None => tp,
            }
        })
        .collect();
    if tps.is_empty() {
        warn!(node = node_id, degree, "degree without TTP mapping");
    }
    tps.push(TerminationPoint::new(
        topology_id.clone(),
        degree_ctp(degree),
        TpType::DegreeTxRxCtp,
        TpDirection::TxRx,
    ));

    roadm_node(node_id, clli, topology_id, NodeRole::Degree { degree_number: degree })
        .with_termination_points(tps)
}

fn create_srg(node_id: &str, clli: &str, srg: u16, entries: &[&Mapping]) -> Node {
    let topology_id = srg_node_id(node_id, srg);
    let mut tps: Vec<TerminationPoint> = entries
        .iter()
        .filter(|entry| entry.logical_connection_point.contains("-PP"))
        .map(|entry| {
            let direction = tp_direction(entry.port_direction);
            let tp = TerminationPoint::new(
                topology_id.clone(),
                entry.logical_connection_point.as_str(),
                TpType::srg_pp(direction),
                direction,
            );
            match &entry.partner_lcp {
                Some(partner) => tp.with_associated_tp(partner.as_str()),
                None => tp,
            }
        })
        .collect();
    tps.push(TerminationPoint::new(
        topology_id.clone(),
        srg_cp(srg),
        TpType::SrgTxRxCp,
        TpDirection::TxRx,
    ));

    roadm_node(node_id, clli, topology_id, NodeRole::Srg { srg_number: srg })
        .with_termination_points(tps)
}
