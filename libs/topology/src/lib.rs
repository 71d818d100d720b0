//! # Topology Engine
//!
//! Layered graph model of an optical transport network: ROADM degrees and
//! SRGs, transponders, muxponders and OTN switches, the links between them,
//! and the timeslot / tributary-port accounting inside OTN multiplexing
//! links.
//!
//! ## Layout
//!
//! - [`model`]: nodes, termination points, links, [`TopologyShard`]
//! - [`link_id`]: deterministic link identifiers
//! - [`pool`]: fixed-size TS / TPN pools and the client rate table
//! - [`builder`]: per-element shard builders driven by the port mapping
//! - [`links`]: OTN link engine and ROADM-layer link builders
//! - [`discovery`]: LLDP-driven ROADM-to-ROADM link discovery
//! - [`datastore`]: transaction contract and an in-memory broker
//! - [`service`]: handler entry points with read-compute-commit retry
//! - [`dispatcher`]: per-node ordered event workers
//!
//! Builders and link-engine functions are pure: they take inputs by
//! reference and return a new shard. Expected failures (bad input, pool
//! exhaustion) return [`TopologyShard::empty`] rather than an error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use config::EngineConfig;
//! use topology::{InMemoryPortMapping, MemoryDataBroker, NetworkModelService};
//! # use topology::discovery::{DeviceAccess, DeviceError, LldpNeighbors};
//! # struct NoDevices;
//! # impl DeviceAccess for NoDevices {
//! #     fn is_mounted(&self, _: &str) -> bool { false }
//! #     fn read_lldp(&self, _: &str, _: &str, _: std::time::Duration)
//! #         -> Result<Option<LldpNeighbors>, DeviceError> { Ok(None) }
//! # }
//!
//! let config = EngineConfig::default();
//! let service = NetworkModelService::new(
//!     Arc::new(MemoryDataBroker::new()),
//!     Arc::new(InMemoryPortMapping::new()),
//!     Arc::new(NoDevices),
//!     &config,
//! );
//! let _ = service.on_device_connected("ROADM-A1");
//! ```

pub mod builder;
pub mod datastore;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod link_id;
pub mod links;
pub mod mapping;
pub mod model;
pub mod pool;
pub mod service;

pub use builder::{
    create_topology_shard, create_topology_shard_for_roadm, create_topology_shard_for_xpdr,
};
pub use datastore::{DataBroker, LogicalDatastore, MemoryDataBroker, StoreError, TopologyPath};
pub use dispatcher::{EventDispatcher, EventHandler, TopologyEvent};
pub use error::{Result, TopologyError};
pub use link_id::{build_link_id, build_otn_link_id, opposite_link_id};
pub use mapping::{InMemoryPortMapping, NodeMapping, PortMappingSource};
pub use model::{Link, LinkId, Node, NodeId, TerminationPoint, TopologyShard, TpId};
pub use pool::{ClientRate, ResourcePool, TpPools};
pub use service::{NetworkModelService, OtnEndpoints, ServiceEvent};
