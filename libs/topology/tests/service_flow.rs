//! Network model service end to end on the in-memory broker

mod common;

use common::{lldp_interface, roadm_mapping, spdr_mapping, FakeDevices};
use config::EngineConfig;
use std::sync::Arc;
use topology::datastore::{DataBroker, LogicalDatastore, TopologyTransactionExt};
use topology::discovery::LldpNeighbor;
use topology::links::XpdrRdmRequest;
use topology::model::{LinkId, LinkType, NetworkLayer, NodeId, OtnLinkType, TerminationPoint, TpId};
use topology::{
    ClientRate, InMemoryPortMapping, Link, MemoryDataBroker, NetworkModelService, OtnEndpoints,
    ServiceEvent,
};

const STORE: LogicalDatastore = LogicalDatastore::Configuration;

struct Harness {
    broker: MemoryDataBroker,
    devices: Arc<FakeDevices>,
    service: NetworkModelService,
}

fn harness(config: &EngineConfig) -> Harness {
    let broker = MemoryDataBroker::new();
    let mappings = Arc::new(InMemoryPortMapping::new());
    mappings.insert(spdr_mapping("SPDRA"));
    mappings.insert(spdr_mapping("SPDRZ"));
    mappings.insert(roadm_mapping("ROADM-A1", Some("NodeA"), &[(1, true), (2, true)], &[1]));
    mappings.insert(roadm_mapping("ROADM-C1", Some("NodeC"), &[(1, false)], &[]));
    let devices = Arc::new(FakeDevices::new());
    let service = NetworkModelService::new(
        Arc::new(broker.clone()),
        mappings,
        devices.clone(),
        config,
    );
    Harness {
        broker,
        devices,
        service,
    }
}

fn endpoints() -> OtnEndpoints {
    OtnEndpoints::new("SPDRA", "XPDR1-NETWORK1", "SPDRZ", "XPDR1-NETWORK1")
}

fn client(tributary_port: u16, rate: ClientRate) -> ServiceEvent {
    ServiceEvent::Client {
        endpoints: endpoints(),
        rate,
        tributary_port,
        tributary_slot: None,
    }
}

fn read_link(broker: &MemoryDataBroker, id: &LinkId) -> Option<Link> {
    broker
        .new_transaction()
        .read_link(STORE, NetworkLayer::OtnTopology, id)
        .unwrap()
}

fn read_network_tp(broker: &MemoryDataBroker, node: &str) -> TerminationPoint {
    broker
        .new_transaction()
        .read_tp(
            STORE,
            NetworkLayer::OtnTopology,
            &NodeId::new(format!("{node}-XPDR1")),
            &TpId::new("XPDR1-NETWORK1"),
        )
        .unwrap()
        .unwrap()
}

/// Both muxponders connected, OTU4 and ODU4 layers in place
fn provisioned(config: &EngineConfig) -> Harness {
    let h = harness(config);
    assert!(h.service.on_device_connected("SPDRA").unwrap());
    assert!(h.service.on_device_connected("SPDRZ").unwrap());
    assert!(h.service.on_service_created(&ServiceEvent::Otu4(endpoints())).unwrap());
    assert!(h.service.on_service_created(&ServiceEvent::Odu4(endpoints())).unwrap());
    h
}

#[test_log::test]
fn test_otn_service_lifecycle() {
    let h = provisioned(&EngineConfig::default());
    let [otu4_az, _] = endpoints().link_ids(OtnLinkType::Otu4);
    let [odtu4_az, odtu4_za] = endpoints().link_ids(OtnLinkType::Odtu4);

    assert_eq!(read_link(&h.broker, &otu4_az).unwrap().bandwidth.unwrap().used, 100_000);
    let odtu4 = read_link(&h.broker, &odtu4_az).unwrap();
    assert_eq!(odtu4.link_type, LinkType::OtnLink(OtnLinkType::Odtu4));
    assert_eq!(odtu4.bandwidth.unwrap().available, 100_000);

    assert!(h.service.on_service_created(&client(1, ClientRate::TenGe)).unwrap());
    for id in [&odtu4_az, &odtu4_za] {
        let bandwidth = read_link(&h.broker, id).unwrap().bandwidth.unwrap();
        assert_eq!((bandwidth.available, bandwidth.used), (90_000, 10_000));
    }
    for node in ["SPDRA", "SPDRZ"] {
        let pools = read_network_tp(&h.broker, node).otn.unwrap();
        assert_eq!(pools.ts_pool.free_count(), 72);
        assert_eq!(pools.tpn_pool.free_count(), 79);
    }

    // same port again is rejected without touching the store
    let commits = h.broker.stats().commits;
    assert!(!h.service.on_service_created(&client(1, ClientRate::OneGe)).unwrap());
    assert_eq!(h.broker.stats().commits, commits);

    assert!(h.service.on_service_deleted(&client(1, ClientRate::TenGe)).unwrap());
    assert_eq!(read_link(&h.broker, &odtu4_az).unwrap().bandwidth.unwrap().available, 100_000);
    assert_eq!(read_network_tp(&h.broker, "SPDRA").otn.unwrap().ts_pool.free_count(), 80);

    assert!(h.service.on_service_deleted(&ServiceEvent::Odu4(endpoints())).unwrap());
    assert!(read_link(&h.broker, &odtu4_az).is_none());
    assert_eq!(read_link(&h.broker, &otu4_az).unwrap().bandwidth.unwrap().available, 100_000);
    assert!(read_network_tp(&h.broker, "SPDRZ").otn.is_none());

    assert!(h.service.on_service_deleted(&ServiceEvent::Otu4(endpoints())).unwrap());
    assert!(read_link(&h.broker, &otu4_az).is_none());
    assert!(!h.service.on_service_deleted(&ServiceEvent::Otu4(endpoints())).unwrap());
}

#[test_log::test]
fn test_duplicate_otu4_is_noop() {
    let h = harness(&EngineConfig::default());
    assert!(h.service.on_service_created(&ServiceEvent::Otu4(endpoints())).unwrap());
    assert!(!h.service.on_service_created(&ServiceEvent::Otu4(endpoints())).unwrap());
}

#[test_log::test]
fn test_odu4_without_otu4_is_an_error() {
    let h = harness(&EngineConfig::default());
    h.service.on_device_connected("SPDRA").unwrap();
    h.service.on_device_connected("SPDRZ").unwrap();
    let err = h
        .service
        .on_service_created(&ServiceEvent::Odu4(endpoints()))
        .unwrap_err();
    assert!(matches!(err, topology::TopologyError::LinkNotFound { .. }));
}

#[test_log::test]
fn test_reconnect_keeps_allocations() {
    let h = provisioned(&EngineConfig::default());
    assert!(h.service.on_service_created(&client(2, ClientRate::OneGe)).unwrap());
    assert!(h.service.on_device_connected("SPDRA").unwrap());

    let pools = read_network_tp(&h.broker, "SPDRA").otn.unwrap();
    assert_eq!(pools.tpn_pool.used_indices(), vec![2]);
    assert_eq!(pools.ts_pool.used_indices(), vec![2]);
}

#[test_log::test]
fn test_concurrent_allocations_never_double_book() {
    let mut config = EngineConfig::default();
    config.datastore.commit_retries = 100;
    config.datastore.retry_backoff_ms = 1;
    let h = provisioned(&config);

    // eight distinct ports plus eight requests fighting over port 40
    let outcomes: Vec<(u16, bool)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=8u16)
            .flat_map(|tpn| [tpn, 40])
            .map(|tpn| {
                let service = &h.service;
                scope.spawn(move || {
                    let applied = service
                        .on_service_created(&client(tpn, ClientRate::OneGe))
                        .unwrap();
                    (tpn, applied)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(outcomes.iter().filter(|(tpn, _)| *tpn != 40).all(|(_, applied)| *applied));
    assert_eq!(outcomes.iter().filter(|(tpn, applied)| *tpn == 40 && *applied).count(), 1);

    let [odtu4_az, _] = endpoints().link_ids(OtnLinkType::Odtu4);
    let bandwidth = read_link(&h.broker, &odtu4_az).unwrap().bandwidth.unwrap();
    assert_eq!(bandwidth.used, 9_000);
    for node in ["SPDRA", "SPDRZ"] {
        let pools = read_network_tp(&h.broker, node).otn.unwrap();
        assert_eq!(pools.tpn_pool.used_count(), 9);
        assert_eq!(pools.ts_pool.used_count(), 9);
    }
}

#[test_log::test]
fn test_roadm_connect_discovers_neighbors() {
    let h = harness(&EngineConfig::default());
    h.devices.mount("ROADM-A1");
    h.devices.mount("ROADM-C1");
    h.devices.set_neighbors(
        "ROADM-A1",
        vec![LldpNeighbor::new(&lldp_interface(2), "ROADM-C1", &lldp_interface(1))],
    );

    assert!(h.service.on_device_connected("ROADM-A1").unwrap());

    let mut tx = h.broker.new_transaction();
    let links = tx.read_links(STORE, NetworkLayer::OpenroadmTopology).unwrap();
    let nodes = tx.read_nodes(STORE, NetworkLayer::OpenroadmTopology).unwrap();
    assert_eq!(nodes.len(), 3);
    // 2 express, 2 add, 2 drop, 2 ROADM-to-ROADM
    assert_eq!(links.len(), 8);
    assert_eq!(
        links
            .iter()
            .filter(|link| link.link_type == LinkType::RoadmToRoadm)
            .count(),
        2
    );
}

#[test_log::test]
fn test_xponder_to_roadm_links() {
    let h = harness(&EngineConfig::default());
    let request = XpdrRdmRequest {
        xpdr_node: "SPDRA".to_string(),
        xpdr_number: 1,
        network_number: 1,
        rdm_node: "ROADM-A1".to_string(),
        srg_number: 1,
        termination_point: "SRG1-PP1-TXRX".to_string(),
    };
    assert!(h.service.link_xponder_to_roadm(&request).unwrap());

    let mut tx = h.broker.new_transaction();
    let links = tx.read_links(STORE, NetworkLayer::OpenroadmTopology).unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.iter().any(|link| link.link_type == LinkType::XponderOutput));
    assert!(links.iter().any(|link| link.link_type == LinkType::XponderInput));
}

#[test_log::test]
fn test_device_removal_cleans_nodes_and_links() {
    let h = provisioned(&EngineConfig::default());
    assert!(h.service.on_device_removed("SPDRA").unwrap());

    let mut tx = h.broker.new_transaction();
    let nodes = tx.read_nodes(STORE, NetworkLayer::OtnTopology).unwrap();
    let ids: Vec<_> = nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, vec!["SPDRZ-XPDR1"]);
    assert!(tx.read_links(STORE, NetworkLayer::OtnTopology).unwrap().is_empty());
    assert!(tx
        .read_node(STORE, NetworkLayer::OpenroadmTopology, &NodeId::new("SPDRA-XPDR1"))
        .unwrap()
        .is_none());

    assert!(!h.service.on_device_removed("SPDRA").unwrap());
}

#[test_log::test]
fn test_missing_mapping_is_an_error() {
    let h = harness(&EngineConfig::default());
    let err = h.service.on_device_connected("UNKNOWN").unwrap_err();
    assert!(matches!(err, topology::TopologyError::MappingNotFound { .. }));
}

#[test_log::test]
fn test_otu4_delete_refused_under_odtu4() {
    let h = provisioned(&EngineConfig::default());
    assert!(h.service.on_service_created(&client(1, ClientRate::TenGe)).unwrap());
    let [otu4_az, otu4_za] = endpoints().link_ids(OtnLinkType::Otu4);
    let [odtu4_az, _] = endpoints().link_ids(OtnLinkType::Odtu4);

    assert!(!h.service.on_service_deleted(&ServiceEvent::Otu4(endpoints())).unwrap());
    assert!(read_link(&h.broker, &otu4_az).is_some());
    assert!(read_link(&h.broker, &otu4_za).is_some());
    assert_eq!(read_link(&h.broker, &odtu4_az).unwrap().bandwidth.unwrap().used, 10_000);
    assert_eq!(read_network_tp(&h.broker, "SPDRA").otn.unwrap().ts_pool.used_count(), 8);

    // torn down top-down it goes through
    assert!(h.service.on_service_deleted(&ServiceEvent::Odu4(endpoints())).unwrap());
    assert!(h.service.on_service_deleted(&ServiceEvent::Otu4(endpoints())).unwrap());
    assert!(read_link(&h.broker, &otu4_az).is_none());
}

#[test_log::test]
fn test_deleting_unknown_client_leaves_links_alone() {
    let h = provisioned(&EngineConfig::default());
    assert!(h.service.on_service_created(&client(1, ClientRate::TenGe)).unwrap());

    assert!(!h.service.on_service_deleted(&client(2, ClientRate::TenGe)).unwrap());
    assert!(h.service.on_service_deleted(&client(1, ClientRate::TenGe)).unwrap());
    assert!(!h.service.on_service_deleted(&client(1, ClientRate::TenGe)).unwrap());

    let [odtu4_az, _] = endpoints().link_ids(OtnLinkType::Odtu4);
    let bandwidth = read_link(&h.broker, &odtu4_az).unwrap().bandwidth.unwrap();
    assert_eq!((bandwidth.available, bandwidth.used), (100_000, 0));
}
