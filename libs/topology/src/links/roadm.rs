//! ROADM-layer link builders and termination point naming

use crate::link_id::build_link_id;
use crate::model::{Link, LinkEnd, LinkType, NodeId, TpDirection, TpId};
use serde::{Deserialize, Serialize};

pub fn degree_node_id(node_id: &str, degree: u16) -> NodeId {
    NodeId::new(format!("{node_id}-DEG{degree}"))
}

pub fn srg_node_id(node_id: &str, srg: u16) -> NodeId {
    NodeId::new(format!("{node_id}-SRG{srg}"))
}

pub fn degree_ttp(degree: u16, direction: TpDirection) -> TpId {
    TpId::new(format!("DEG{degree}-TTP-{}", direction.suffix()))
}

pub fn degree_ctp(degree: u16) -> TpId {
    TpId::new(format!("DEG{degree}-CTP-TXRX"))
}

pub fn srg_cp(srg: u16) -> TpId {
    TpId::new(format!("SRG{srg}-CP-TXRX"))
}

/// Two directed links, A to Z and Z to A, each naming the other as opposite
fn link_pair(
    az_source: LinkEnd,
    az_destination: LinkEnd,
    az_type: LinkType,
    za_source: LinkEnd,
    za_destination: LinkEnd,
    za_type: LinkType,
) -> Vec<Link> {
    let az_id = build_link_id(
        az_source.node.as_str(),
        az_source.tp.as_str(),
        az_destination.node.as_str(),
        az_destination.tp.as_str(),
    );
    let za_id = build_link_id(
        za_source.node.as_str(),
        za_source.tp.as_str(),
        za_destination.node.as_str(),
        za_destination.tp.as_str(),
    );

    vec![
        Link {
            id: az_id.clone(),
            source: az_source,
            destination: az_destination,
            link_type: az_type,
            opposite_link: Some(za_id.clone()),
            bandwidth: None,
        },
        Link {
            id: za_id,
            source: za_source,
            destination: za_destination,
            link_type: za_type,
            opposite_link: Some(az_id),
            bandwidth: None,
        },
    ]
}

/// Express links between every ordered pair of distinct degrees: N*(N-1) links
pub fn express_links(node_id: &str, degrees: &[u16]) -> Vec<Link> {
    let mut links = Vec::with_capacity(degrees.len() * degrees.len().saturating_sub(1));
    for (i, &deg_a) in degrees.iter().enumerate() {
        for &deg_z in &degrees[i + 1..] {
            let a = LinkEnd {
                node: degree_node_id(node_id, deg_a),
                tp: degree_ctp(deg_a),
            };
            let z = LinkEnd {
                node: degree_node_id(node_id, deg_z),
                tp: degree_ctp(deg_z),
            };
            links.extend(link_pair(
                a.clone(),
                z.clone(),
                LinkType::ExpressLink,
                z,
                a,
                LinkType::ExpressLink,
            ));
        }
    }
    links
}

/// One drop link (degree to SRG) and one add link (SRG to degree) per degree/SRG pair
pub fn add_drop_links(node_id: &str, degrees: &[u16], srgs: &[u16]) -> Vec<Link> {
    let mut links = Vec::with_capacity(2 * degrees.len() * srgs.len());
    for &degree in degrees {
        for &srg in srgs {
            let deg_end = LinkEnd {
                node: degree_node_id(node_id, degree),
                tp: degree_ctp(degree),
            };
            let srg_end = LinkEnd {
                node: srg_node_id(node_id, srg),
                tp: srg_cp(srg),
            };
            links.extend(link_pair(
                deg_end.clone(),
                srg_end.clone(),
                LinkType::DropLink,
                srg_end,
                deg_end,
                LinkType::AddLink,
            ));
        }
    }
    links
}

/// Line-side termination points of one resolved degree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeEnd {
    pub node: NodeId,
    pub tx_tp: TpId,
    pub rx_tp: TpId,
}

impl DegreeEnd {
    /// Single TXRX port
    pub fn bidirectional(node_id: &str, degree: u16) -> Self {
        let tp = degree_ttp(degree, TpDirection::TxRx);
        Self {
            node: degree_node_id(node_id, degree),
            tx_tp: tp.clone(),
            rx_tp: tp,
        }
    }

    /// Separate TX and RX ports
    pub fn unidirectional(node_id: &str, degree: u16) -> Self {
        Self {
            node: degree_node_id(node_id, degree),
            tx_tp: degree_ttp(degree, TpDirection::Tx),
            rx_tp: degree_ttp(degree, TpDirection::Rx),
        }
    }
}

/// ROADM-to-ROADM pair: A transmit to Z receive, and Z transmit to A receive
pub fn create_r2r_links(a: &DegreeEnd, z: &DegreeEnd) -> Vec<Link> {
    link_pair(
        LinkEnd::new(a.node.clone(), a.tx_tp.clone()),
        LinkEnd::new(z.node.clone(), z.rx_tp.clone()),
        LinkType::RoadmToRoadm,
        LinkEnd::new(z.node.clone(), z.tx_tp.clone()),
        LinkEnd::new(a.node.clone(), a.rx_tp.clone()),
        LinkType::RoadmToRoadm,
    )
}

/// Request to connect one xponder network port to one SRG add/drop port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpdrRdmRequest {
    pub xpdr_node: String,
    pub xpdr_number: u16,
    pub network_number: u16,
    pub rdm_node: String,
    pub srg_number: u16,
    /// SRG physical port, e.g. `SRG1-PP1-TXRX`
    pub termination_point: String,
}

impl XpdrRdmRequest {
    pub fn xpdr_end(&self) -> LinkEnd {
        LinkEnd::new(
            format!("{}-XPDR{}", self.xpdr_node, self.xpdr_number),
            format!("XPDR{}-NETWORK{}", self.xpdr_number, self.network_number),
        )
    }

    pub fn srg_end(&self) -> LinkEnd {
        LinkEnd::new(
            srg_node_id(&self.rdm_node, self.srg_number),
            self.termination_point.as_str(),
        )
    }
}

/// Xponder output (network port into the SRG) and input (SRG into the network port)
pub fn create_xpdr_rdm_links(request: &XpdrRdmRequest) -> Vec<Link> {
    let xpdr = request.xpdr_end();
    let srg = request.srg_end();
    link_pair(
        xpdr.clone(),
        srg.clone(),
        LinkType::XponderOutput,
        srg,
        xpdr,
        LinkType::XponderInput,
    )
}
