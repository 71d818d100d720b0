//! Xponder shard: one node per xponder number, roles from the inventory

use crate::error::Result;
use crate::mapping::{LcpGroup, Mapping, NodeMapping, PortDirection, XpdrNodeType};
use crate::model::{
    NetworkLayer, NonBlockingList, Node, NodeId, NodeRole, OduSwitchingPool, SwitchingPools,
    TerminationPoint, TopologyShard, TpDirection, TpId, TpType,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Build one topology node per xponder of the element.
///
/// Xponders never produce intra-node links; the shard carries an empty link list.
pub fn create_topology_shard_for_xpdr(mapping: &NodeMapping) -> Result<TopologyShard> {
    let node_id = mapping.node_id.as_str();

    let mut xponders: BTreeMap<u16, Vec<&Mapping>> = BTreeMap::new();
    for entry in &mapping.mappings {
        match entry.group() {
            Some(LcpGroup::Xponder(number)) => xponders.entry(number).or_default().push(entry),
            _ => debug!(
                node = node_id,
                lcp = %entry.logical_connection_point,
                "skipping non-xponder mapping"
            ),
        }
    }

    let nodes: Vec<Node> = xponders
        .iter()
        .map(|(&xpdr_number, entries)| create_xponder(mapping, xpdr_number, entries))
        .collect();

    debug!(node = node_id, xponders = nodes.len(), "built xponder shard");
    Ok(TopologyShard::default()
        .with_nodes(nodes)
        .with_links(Vec::new()))
}

fn is_network(entry: &Mapping) -> bool {
    match entry.port_qualifier {
        Some(qualifier) => qualifier.is_network(),
        None => entry.logical_connection_point.contains("-NETWORK"),
    }
}

fn is_client(entry: &Mapping) -> bool {
    match entry.port_qualifier {
        Some(qualifier) => qualifier.is_client(),
        None => entry.logical_connection_point.contains("-CLIENT"),
    }
}

fn create_xponder(mapping: &NodeMapping, xpdr_number: u16, entries: &[&Mapping]) -> Node {
    let node_id = mapping.node_id.as_str();
    let topology_id = NodeId::new(format!("{node_id}-XPDR{xpdr_number}"));

    let xponder_type = entries
        .iter()
        .find_map(|entry| entry.xponder_type)
        .unwrap_or(XpdrNodeType::Tpdr);

    let networks: Vec<&Mapping> = entries.iter().copied().filter(|e| is_network(e)).collect();
    let clients: Vec<&Mapping> = entries.iter().copied().filter(|e| is_client(e)).collect();
    if networks.is_empty() {
        warn!(node = node_id, xpdr_number, "xponder without network port");
    }

    let mut tps = Vec::with_capacity(networks.len() + clients.len());
    for entry in &networks {
        tps.push(xponder_tp(&topology_id, entry, TpType::XponderNetwork, xponder_type));
    }
    for entry in &clients {
        tps.push(xponder_tp(&topology_id, entry, TpType::XponderClient, xponder_type));
    }

    let role = match xponder_type {
        XpdrNodeType::Tpdr => NodeRole::Transponder { xpdr_number },
        XpdrNodeType::Mpdr => NodeRole::Muxponder {
            xpdr_number,
            switching_pools: muxponder_pools(&networks, &clients),
        },
        XpdrNodeType::Switch => NodeRole::Switch {
            xpdr_number,
            switching_pools: switch_pools(mapping, xpdr_number, entries),
        },
    };

    let mut node = Node::new(topology_id.clone(), role)
        .with_supporting_node(NetworkLayer::OpenroadmNetwork, node_id)
        .with_supporting_node(NetworkLayer::OpenroadmTopology, topology_id.as_str())
        .with_termination_points(tps);
    if let Some(clli) = mapping.node_info.clli.as_deref().filter(|c| !c.is_empty()) {
        node.set_supporting_node(NetworkLayer::Clli, clli);
    }
    node
}

fn xponder_tp(
    topology_id: &NodeId,
    entry: &Mapping,
    tp_type: TpType,
    xponder_type: XpdrNodeType,
) -> TerminationPoint {
    let direction = match entry.port_direction {
        PortDirection::Tx => TpDirection::Tx,
        PortDirection::Rx => TpDirection::Rx,
        PortDirection::Bidirectional => TpDirection::TxRx,
    };
    let tp = TerminationPoint::new(
        topology_id.clone(),
        entry.logical_connection_point.as_str(),
        tp_type,
        direction,
    )
    .with_capabilities(entry.supported_interface_capability.clone());

    // client/network pairing only means something on a transponder
    match (&entry.connection_map_lcp, xponder_type) {
        (Some(pair), XpdrNodeType::Tpdr) => tp.with_associated_tp(pair.as_str()),
        _ => tp,
    }
}

/// One non-blocking list per network port with the clients mapped onto it.
/// Clients without a declared network are reachable from every list.
fn muxponder_pools(networks: &[&Mapping], clients: &[&Mapping]) -> SwitchingPools {
    let non_blocking_lists = networks
        .iter()
        .zip(1u16..)
        .map(|(network, nbl_number)| {
            let network_lcp = network.logical_connection_point.as_str();
            let mut tps = vec![TpId::new(network_lcp)];
            tps.extend(
                clients
                    .iter()
                    .filter(|client| {
                        client
                            .connection_map_lcp
                            .as_deref()
                            .map_or(true, |lcp| lcp == network_lcp)
                    })
                    .map(|client| TpId::new(client.logical_connection_point.as_str())),
            );
            NonBlockingList {
                nbl_number,
                interconnect_bandwidth_mbps: None,
                tps,
            }
        })
        .collect();

    SwitchingPools {
        odu_switching_pools: vec![OduSwitchingPool {
            switching_pool_number: 1,
            non_blocking_lists,
        }],
    }
}

/// Declared switching pools touching this xponder, or a single list of every port
fn switch_pools(mapping: &NodeMapping, xpdr_number: u16, entries: &[&Mapping]) -> SwitchingPools {
    let belongs = |lcp: &String| LcpGroup::parse(lcp) == Some(LcpGroup::Xponder(xpdr_number));

    let declared: Vec<OduSwitchingPool> = mapping
        .switching_pool_lcp
        .iter()
        .filter(|pool| {
            pool.non_blocking_lists
                .iter()
                .any(|nbl| nbl.lcps.iter().any(belongs))
        })
        .map(|pool| OduSwitchingPool {
            switching_pool_number: pool.switching_pool_number,
            non_blocking_lists: pool
                .non_blocking_lists
                .iter()
                .map(|nbl| NonBlockingList {
                    nbl_number: nbl.nbl_number,
                    interconnect_bandwidth_mbps: nbl.interconnect_bandwidth_mbps,
                    tps: nbl.lcps.iter().map(|lcp| TpId::new(lcp.as_str())).collect(),
                })
                .collect(),
        })
        .collect();

    if !declared.is_empty() {
        return SwitchingPools {
            odu_switching_pools: declared,
        };
    }

    debug!(
        node = %mapping.node_id,
        xpdr_number,
        "no declared switching pool, using one list of all ports"
    );
    let mut tps: Vec<TpId> = entries
        .iter()
        .filter(|entry| is_network(entry) || is_client(entry))
        .map(|entry| TpId::new(entry.logical_connection_point.as_str()))
        .collect();
    tps.sort();
    SwitchingPools {
        odu_switching_pools: vec![OduSwitchingPool {
            switching_pool_number: 1,
            non_blocking_lists: vec![NonBlockingList {
                nbl_number: 1,
                interconnect_bandwidth_mbps: None,
                tps,
            }],
        }],
    }
}
