//! OTN link engine
//!
//! Creates OTU4 link pairs, derives ODTU4 pairs on top of them, moves
//! bandwidth and tributary resources when client services come and go, and
//! tears the multiplexing layer down again.
//!
//! Every function here is pure and all-or-nothing: malformed input (a link
//! without bandwidth, an unsupported rate, exhausted pools) yields
//! [`TopologyShard::empty`] and an error log, never a partial result.

use crate::link_id::build_otn_link_id;
use crate::model::{
    Link, LinkEnd, LinkType, NodeId, OtnLinkBandwidth, OtnLinkType, TerminationPoint, TopologyShard,
};
use crate::pool::{ClientRate, TpPools, DEFAULT_POOL_SIZE};
use tracing::{debug, error, warn};

/// Topology node of an xponder port: `SPDRA` + `XPDR1-NETWORK1` gives `SPDRA-XPDR1`
pub fn xpdr_topology_node(node_id: &str, tp: &str) -> NodeId {
    let xpdr = tp.split('-').next().unwrap_or(tp);
    NodeId::new(format!("{node_id}-{xpdr}"))
}

/// Create an OTN link pair between two xponder network ports.
///
/// Only OTU4 can be instantiated directly; any other type gives an empty
/// shard because ODU-layer links are derived from existing OTU4 links.
pub fn create_otn_links(
    node_a: &str,
    tp_a: &str,
    node_z: &str,
    tp_z: &str,
    link_type: OtnLinkType,
) -> TopologyShard {
    if link_type != OtnLinkType::Otu4 {
        warn!(link_type = %link_type, "only OTU4 links can be created directly");
        return TopologyShard::empty();
    }

    let a = LinkEnd::new(xpdr_topology_node(node_a, tp_a), tp_a);
    let z = LinkEnd::new(xpdr_topology_node(node_z, tp_z), tp_z);
    TopologyShard::default().with_links(initialise_otn_links(a, z, link_type))
}

fn initialise_otn_links(a: LinkEnd, z: LinkEnd, link_type: OtnLinkType) -> Vec<Link> {
    let az_id = build_otn_link_id(link_type, a.node.as_str(), a.tp.as_str(), z.node.as_str(), z.tp.as_str());
    let za_id = build_otn_link_id(link_type, z.node.as_str(), z.tp.as_str(), a.node.as_str(), a.tp.as_str());
    let bandwidth = OtnLinkBandwidth::unused(link_type.capacity_mbps());

    vec![
        Link {
            id: az_id.clone(),
            source: a.clone(),
            destination: z.clone(),
            link_type: LinkType::OtnLink(link_type),
            opposite_link: Some(za_id.clone()),
            bandwidth: Some(bandwidth),
        },
        Link {
            id: za_id,
            source: z,
            destination: a,
            link_type: LinkType::OtnLink(link_type),
            opposite_link: Some(az_id),
            bandwidth: Some(bandwidth),
        },
    ]
}

fn with_bandwidth(link: &Link, available: u32, used: u32) -> Link {
    let mut updated = link.clone();
    updated.bandwidth = Some(OtnLinkBandwidth { available, used });
    updated
}

/// A link pair is usable when both directions carry bandwidth and agree on it
fn check_pair<'a>(links: &'a [Link], operation: &str) -> Option<[(&'a Link, OtnLinkBandwidth); 2]> {
    let [first, second] = links else {
        error!(operation, count = links.len(), "expected exactly one link pair");
        return None;
    };
    let (Some(first_bw), Some(second_bw)) = (first.bandwidth, second.bandwidth) else {
        error!(operation, az = %first.id, za = %second.id, "link without OTN bandwidth parameters");
        return None;
    };
    if first_bw != second_bw {
        error!(operation, az = %first.id, za = %second.id, "opposite links disagree on bandwidth");
        return None;
    }
    Some([(first, first_bw), (second, second_bw)])
}

fn check_tp_pair<'a>(tps: &'a [TerminationPoint], operation: &str) -> Option<&'a [TerminationPoint]> {
    if tps.len() != 2 {
        error!(operation, count = tps.len(), "expected the two link-end termination points");
        return None;
    }
    Some(tps)
}

/// Derive the ODTU4 pair from a fresh OTU4 pair.
///
/// The OTU4 links become fully used, the new ODTU4 links are fully available
/// and both end termination points get full TS and TPN pools. Result: four
/// links and two termination points.
pub fn create_odtu4_links(otu4_links: &[Link], tps: &[TerminationPoint]) -> TopologyShard {
    let Some(pair) = check_pair(otu4_links, "create-odtu4") else {
        return TopologyShard::empty();
    };
    let Some(tps) = check_tp_pair(tps, "create-odtu4") else {
        return TopologyShard::empty();
    };

    let capacity = OtnLinkType::Otu4.capacity_mbps();
    let mut links = Vec::with_capacity(4);
    for (link, bandwidth) in pair {
        if link.link_type != LinkType::OtnLink(OtnLinkType::Otu4) || bandwidth.available != capacity {
            error!(
                link = %link.id,
                available = bandwidth.available,
                "supporting link is not a free OTU4 link"
            );
            return TopologyShard::empty();
        }
        links.push(with_bandwidth(link, 0, capacity));
    }

    let first = pair[0].0;
    links.extend(initialise_otn_links(
        first.source.clone(),
        first.destination.clone(),
        OtnLinkType::Odtu4,
    ));

    let tps = tps
        .iter()
        .map(|tp| {
            let mut updated = tp.clone();
            updated.otn = Some(TpPools::new(DEFAULT_POOL_SIZE));
            updated
        })
        .collect();

    debug!(az = %first.id, "derived ODTU4 links");
    TopologyShard::default().with_links(links).with_tps(tps)
}

/// Allocate (or release, when `is_deletion`) a client service on an ODTU4 pair.
///
/// `rate` is `1G`, `10G` or `100G`; `start_slot` is the first tributary slot.
/// A release of a service that both ends do not hold is rejected, so link
/// bandwidth never drifts from the pools.
pub fn update_otn_links(
    links: &[Link],
    tps: &[TerminationPoint],
    rate: &str,
    tributary_port_number: u16,
    start_slot: u16,
    is_deletion: bool,
) -> TopologyShard {
    let rate = match rate.parse::<ClientRate>() {
        Ok(rate) => rate,
        Err(reason) => {
            warn!(%reason, "cannot update OTN links");
            return TopologyShard::empty();
        }
    };

    let Some(updated_links) = shift_bandwidth(links, rate, is_deletion, "update-otn") else {
        return TopologyShard::empty();
    };
    let Some(tps) = check_tp_pair(tps, "update-otn") else {
        return TopologyShard::empty();
    };

    let mut updated_tps = Vec::with_capacity(tps.len());
    for tp in tps {
        let Some(mut pools) = tp.otn.clone() else {
            error!(node = %tp.node_id, tp = %tp.id, "termination point has no timeslot pools");
            return TopologyShard::empty();
        };
        if is_deletion && !pools.holds(rate, tributary_port_number, Some(start_slot)) {
            error!(
                node = %tp.node_id,
                tp = %tp.id,
                tpn = tributary_port_number,
                start_slot,
                "no such service allocated, nothing to release"
            );
            return TopologyShard::empty();
        }
        let outcome = if is_deletion {
            pools.release(rate, tributary_port_number, Some(start_slot))
        } else {
            pools
                .allocate(rate, tributary_port_number, Some(start_slot))
                .map(|_| ())
        };
        if let Err(reason) = outcome {
            error!(node = %tp.node_id, tp = %tp.id, %reason, "tributary resources unavailable");
            return TopologyShard::empty();
        }
        let mut updated = tp.clone();
        updated.otn = Some(pools);
        updated_tps.push(updated);
    }

    TopologyShard::default()
        .with_links(updated_links)
        .with_tps(updated_tps)
}

/// Move a raw bandwidth between available and used on a supporting link pair.
///
/// Only bandwidths in the client rate table are accepted.
pub fn update_otn_links_bandwidth(links: &[Link], bandwidth_mbps: u32, is_deletion: bool) -> TopologyShard {
    let Some(rate) = ClientRate::from_mbps(bandwidth_mbps) else {
        warn!(bandwidth_mbps, "unsupported service bandwidth");
        return TopologyShard::empty();
    };
    match shift_bandwidth(links, rate, is_deletion, "update-otn-bandwidth") {
        Some(links) => TopologyShard::default().with_links(links),
        None => TopologyShard::empty(),
    }
}

fn shift_bandwidth(links: &[Link], rate: ClientRate, is_deletion: bool, operation: &str) -> Option<Vec<Link>> {
    let pair = check_pair(links, operation)?;
    let amount = rate.bandwidth_mbps();
    let mut updated = Vec::with_capacity(2);
    for (link, bandwidth) in pair {
        let shifted = if is_deletion {
            bandwidth.restore(amount)
        } else {
            bandwidth.consume(amount)
        };
        let Some(shifted) = shifted else {
            error!(
                operation,
                link = %link.id,
                available = bandwidth.available,
                used = bandwidth.used,
                amount,
                "bandwidth change exceeds link state"
            );
            return None;
        };
        updated.push(with_bandwidth(link, shifted.available, shifted.used));
    }
    Some(updated)
}

/// Tear the multiplexing layer down: the OTU4 pair becomes fully available again
/// and the end termination points lose their pools.
pub fn delete_otn_links(links: &[Link], tps: &[TerminationPoint]) -> TopologyShard {
    let Some(pair) = check_pair(links, "delete-otn") else {
        return TopologyShard::empty();
    };
    let Some(tps) = check_tp_pair(tps, "delete-otn") else {
        return TopologyShard::empty();
    };

    let links = pair
        .iter()
        .map(|(link, bandwidth)| with_bandwidth(link, bandwidth.capacity(), 0))
        .collect();
    let tps = tps
        .iter()
        .map(|tp| {
            let mut updated = tp.clone();
            updated.otn = None;
            updated
        })
        .collect();

    TopologyShard::default().with_links(links).with_tps(tps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TpDirection, TpType};

    fn otu4_pair() -> Vec<Link> {
        create_otn_links("SPDRA", "XPDR1-NETWORK1", "SPDRZ", "XPDR1-NETWORK1", OtnLinkType::Otu4)
            .links
            .unwrap()
    }

    fn network_tps() -> Vec<TerminationPoint> {
        ["SPDRA-XPDR1", "SPDRZ-XPDR1"]
            .iter()
            .map(|node| {
                TerminationPoint::new(*node, "XPDR1-NETWORK1", TpType::XponderNetwork, TpDirection::TxRx)
            })
            .collect()
    }

    #[test]
    fn test_xpdr_topology_node() {
        assert_eq!(xpdr_topology_node("SPDRA", "XPDR1-NETWORK1"), "SPDRA-XPDR1");
        assert_eq!(xpdr_topology_node("SPDRA", "XPDR2-CLIENT3"), "SPDRA-XPDR2");
    }

    #[test]
    fn test_only_otu4_created_directly() {
        let shard = create_otn_links("SPDRA", "XPDR1-NETWORK1", "SPDRZ", "XPDR1-NETWORK1", OtnLinkType::Odu0);
        assert!(shard.is_empty());
    }

    #[test]
    fn test_odtu4_needs_free_otu4() {
        let mut links = otu4_pair();
        for link in &mut links {
            link.bandwidth = Some(OtnLinkBandwidth { available: 90_000, used: 10_000 });
        }
        assert!(create_odtu4_links(&links, &network_tps()).is_empty());
    }

    #[test]
    fn test_single_link_rejected() {
        let links = otu4_pair();
        assert!(create_odtu4_links(&links[..1], &network_tps()).is_empty());
        assert!(delete_otn_links(&links[..1], &network_tps()).is_empty());
    }

    #[test]
    fn test_unknown_rate_rejected() {
        let shard = create_odtu4_links(&otu4_pair(), &network_tps());
        let odtu4: Vec<_> = shard.links()[2..].to_vec();
        assert!(update_otn_links(&odtu4, shard.tps(), "40G", 1, 1, false).is_empty());
    }

    #[test]
    fn test_tpn_reuse_rejected() {
        let shard = create_odtu4_links(&otu4_pair(), &network_tps());
        let odtu4: Vec<_> = shard.links()[2..].to_vec();

        let first = update_otn_links(&odtu4, shard.tps(), "1G", 1, 1, false);
        assert!(!first.is_empty());

        // same TPN on other slots
        let second = update_otn_links(first.links(), first.tps(), "1G", 1, 2, false);
        assert!(second.is_empty());
    }

    #[test]
    fn test_deletion_beyond_used_rejected() {
        let shard = create_odtu4_links(&otu4_pair(), &network_tps());
        let odtu4: Vec<_> = shard.links()[2..].to_vec();
        assert!(update_otn_links(&odtu4, shard.tps(), "10G", 1, 1, true).is_empty());
    }
}
