//! Keyed dispatcher: per-node ordering, draining shutdown and the
//! service handler behind it

mod common;

use common::{spdr_mapping, FakeDevices};
use config::{DiscoveryConfig, EngineConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use topology::datastore::{DataBroker, LogicalDatastore, TopologyTransactionExt};
use topology::discovery::LldpChange;
use topology::model::{NetworkLayer, OtnLinkType};
use topology::{
    ClientRate, EventDispatcher, EventHandler, InMemoryPortMapping, MemoryDataBroker,
    NetworkModelService, OtnEndpoints, Result, ServiceEvent, TopologyError, TopologyEvent,
};

/// Records the sequence number carried in each LLDP change, per node
#[derive(Default)]
struct Recorder {
    seen: Mutex<HashMap<String, Vec<u32>>>,
}

impl EventHandler for Recorder {
    fn handle(&self, event: TopologyEvent) -> Result<()> {
        let TopologyEvent::LldpChanged { node_id, change } = event else {
            return Err(TopologyError::validation("unexpected event"));
        };
        let LldpChange::Added { if_name, .. } = change else {
            return Err(TopologyError::validation("unexpected change"));
        };
        let seq: u32 = if_name
            .parse()
            .map_err(|_| TopologyError::validation("bad sequence"))?;
        // uneven handler time shakes out reordering
        std::thread::sleep(Duration::from_micros(u64::from(seq % 3) * 200));
        self.seen.lock().entry(node_id).or_default().push(seq);
        Ok(())
    }
}

fn numbered(node_id: &str, seq: u32) -> TopologyEvent {
    TopologyEvent::LldpChanged {
        node_id: node_id.to_string(),
        change: LldpChange::Added {
            if_name: seq.to_string(),
            remote_system: "ROADM-C1".to_string(),
            remote_interface: "1GE-interface-1".to_string(),
        },
    }
}

fn discovery_config(worker_count: usize, queue_depth: usize) -> DiscoveryConfig {
    DiscoveryConfig {
        worker_count,
        queue_depth,
        ..DiscoveryConfig::default()
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_events_for_one_node_stay_ordered() {
    let recorder = Arc::new(Recorder::default());
    let dispatcher = EventDispatcher::start(Arc::clone(&recorder), &discovery_config(4, 8));

    let nodes = ["ROADM-A1", "ROADM-B1", "ROADM-C1", "SPDRA", "SPDRZ"];
    for seq in 0..40u32 {
        for node in nodes {
            dispatcher.dispatch(numbered(node, seq)).await.unwrap();
        }
    }

    let stats = dispatcher.shutdown().await.unwrap();
    assert_eq!(stats.dispatched, 200);
    assert_eq!(stats.handled, 200);
    assert_eq!(stats.failed, 0);

    let seen = recorder.seen.lock();
    for node in nodes {
        assert_eq!(seen[node], (0..40).collect::<Vec<u32>>(), "order broken for {node}");
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_handler_errors_are_counted() {
    let recorder = Arc::new(Recorder::default());
    let dispatcher = EventDispatcher::start(Arc::clone(&recorder), &discovery_config(2, 4));

    dispatcher.dispatch(numbered("ROADM-A1", 1)).await.unwrap();
    dispatcher
        .dispatch(TopologyEvent::DeviceConnected {
            node_id: "ROADM-A1".to_string(),
        })
        .await
        .unwrap();

    let stats = dispatcher.shutdown().await.unwrap();
    assert_eq!((stats.dispatched, stats.handled, stats.failed), (2, 1, 1));
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_service_events_through_dispatcher() {
    let broker = MemoryDataBroker::new();
    let mappings = Arc::new(InMemoryPortMapping::new());
    mappings.insert(spdr_mapping("SPDRA"));
    mappings.insert(spdr_mapping("SPDRZ"));
    let config = EngineConfig::default();
    let service = Arc::new(NetworkModelService::new(
        Arc::new(broker.clone()),
        mappings,
        Arc::new(FakeDevices::new()),
        &config,
    ));
    service.on_device_connected("SPDRA").unwrap();
    service.on_device_connected("SPDRZ").unwrap();

    // every event below shares the SPDRA key, so they land in order
    let endpoints = OtnEndpoints::new("SPDRA", "XPDR1-NETWORK1", "SPDRZ", "XPDR1-NETWORK1");
    let dispatcher = EventDispatcher::start(Arc::clone(&service), &config.discovery);
    for event in [
        ServiceEvent::Otu4(endpoints.clone()),
        ServiceEvent::Odu4(endpoints.clone()),
        ServiceEvent::Client {
            endpoints: endpoints.clone(),
            rate: ClientRate::TenGe,
            tributary_port: 3,
            tributary_slot: None,
        },
    ] {
        dispatcher
            .dispatch(TopologyEvent::ServiceCreated(event))
            .await
            .unwrap();
    }
    let stats = dispatcher.shutdown().await.unwrap();
    assert_eq!((stats.handled, stats.failed), (3, 0));

    let [odtu4_az, _] = endpoints.link_ids(OtnLinkType::Odtu4);
    let link = broker
        .new_transaction()
        .read_link(LogicalDatastore::Configuration, NetworkLayer::OtnTopology, &odtu4_az)
        .unwrap()
        .unwrap();
    assert_eq!(link.bandwidth.unwrap().used, 10_000);
}
