//! Shared fixtures: port-mapping snapshots and a scripted device layer

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use topology::discovery::{DeviceAccess, DeviceError, LldpNeighbor, LldpNeighbors};
use topology::mapping::{
    CpToDegree, Mapping, NodeInfo, NodeMapping, NodeType, PortDirection, PortQualifier,
    XpdrNodeType,
};
use topology::model::InterfaceCapability;

pub fn lldp_interface(degree: u16) -> String {
    format!("1GE-interface-{degree}")
}

/// ROADM with the given degrees (`true` = one TXRX port, `false` = TX/RX split)
/// and SRGs with two bidirectional add/drop ports each
pub fn roadm_mapping(node_id: &str, clli: Option<&str>, degrees: &[(u16, bool)], srgs: &[u16]) -> NodeMapping {
    let mut mappings = Vec::new();
    let mut cp_to_degree = Vec::new();
    for &(degree, bidirectional) in degrees {
        let circuit_pack = format!("{degree}/0");
        if bidirectional {
            mappings.push(Mapping::new(
                &format!("DEG{degree}-TTP-TXRX"),
                &circuit_pack,
                "L1",
                PortDirection::Bidirectional,
            ));
        } else {
            mappings.push(Mapping::new(&format!("DEG{degree}-TTP-TX"), &circuit_pack, "L1", PortDirection::Tx));
            mappings.push(Mapping::new(&format!("DEG{degree}-TTP-RX"), &circuit_pack, "L2", PortDirection::Rx));
        }
        cp_to_degree.push(CpToDegree {
            circuit_pack_name: circuit_pack,
            degree_number: degree,
            interface_name: lldp_interface(degree),
        });
    }
    for &srg in srgs {
        for pp in 1..=2 {
            mappings.push(Mapping::new(
                &format!("SRG{srg}-PP{pp}-TXRX"),
                &format!("{}/0", 10 + srg),
                &format!("C{pp}"),
                PortDirection::Bidirectional,
            ));
        }
    }

    NodeMapping {
        node_id: node_id.to_string(),
        node_info: NodeInfo {
            node_type: NodeType::Rdm,
            clli: clli.map(str::to_string),
            vendor: Some("vendorA".to_string()),
            model: Some("model2".to_string()),
            openroadm_version: "2.2.1".to_string(),
        },
        mappings,
        cp_to_degree,
        switching_pool_lcp: Vec::new(),
    }
}

/// Muxponder `XPDR1` with one OTN-capable network port and two clients
pub fn spdr_mapping(node_id: &str) -> NodeMapping {
    let mut network = Mapping::new("XPDR1-NETWORK1", "CP1-CFP0", "CP1-CFP0-P1", PortDirection::Bidirectional);
    network.port_qualifier = Some(PortQualifier::XpdrNetwork);
    network.xponder_type = Some(XpdrNodeType::Mpdr);
    network.supported_interface_capability = vec![InterfaceCapability::IfOchOtu4Odu4];

    let clients = (1..=2).map(|n| {
        let mut client = Mapping::new(
            &format!("XPDR1-CLIENT{n}"),
            &format!("CP1-SFP{n}"),
            &format!("CP1-SFP{n}-P1"),
            PortDirection::Bidirectional,
        );
        client.port_qualifier = Some(PortQualifier::XpdrClient);
        client.xponder_type = Some(XpdrNodeType::Mpdr);
        client.connection_map_lcp = Some("XPDR1-NETWORK1".to_string());
        client.supported_interface_capability = vec![InterfaceCapability::If10GeOdu2e];
        client
    });

    let mut mappings = vec![network];
    mappings.extend(clients);
    NodeMapping {
        node_id: node_id.to_string(),
        node_info: NodeInfo {
            node_type: NodeType::Xpdr,
            clli: Some(format!("Node{node_id}")),
            vendor: Some("vendorA".to_string()),
            model: None,
            openroadm_version: "7.1".to_string(),
        },
        mappings,
        cp_to_degree: Vec::new(),
        switching_pool_lcp: Vec::new(),
    }
}

/// Device layer answering from scripted tables
#[derive(Default)]
pub struct FakeDevices {
    mounted: Mutex<HashSet<String>>,
    lldp: Mutex<HashMap<String, Result<Option<LldpNeighbors>, DeviceError>>>,
    reads: AtomicUsize,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, node_id: &str) {
        self.mounted.lock().insert(node_id.to_string());
    }

    pub fn set_neighbors(&self, node_id: &str, neighbors: Vec<LldpNeighbor>) {
        self.lldp
            .lock()
            .insert(node_id.to_string(), Ok(Some(LldpNeighbors { neighbors })));
    }

    pub fn fail_reads(&self, node_id: &str, error: DeviceError) {
        self.lldp.lock().insert(node_id.to_string(), Err(error));
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DeviceAccess for FakeDevices {
    fn is_mounted(&self, node_id: &str) -> bool {
        self.mounted.lock().contains(node_id)
    }

    fn read_lldp(
        &self,
        node_id: &str,
        _path: &str,
        _timeout: Duration,
    ) -> Result<Option<LldpNeighbors>, DeviceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.lldp.lock().get(node_id).cloned().unwrap_or(Ok(None))
    }
}
