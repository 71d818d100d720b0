//! Transactional datastore contract
//!
//! The engine never owns topology state: every handler opens a transaction,
//! reads what it needs, computes a shard and writes it back. Commit either
//! applies every staged write or none. Implementations detect conflicting
//! commits and report them as [`StoreError::Conflict`], which the service
//! layer answers by recomputing from fresh reads.

pub mod memory;

pub use memory::MemoryDataBroker;

use crate::model::{Link, LinkId, NetworkLayer, Node, NodeId, TerminationPoint, TpId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Concurrent modification of {path}")]
    Conflict { path: String },

    #[error("Entry {path} holds a {found}, expected a {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Commit failed: {message}")]
    Commit { message: String },
}

/// Configuration holds intended state, Operational what the network reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalDatastore {
    Configuration,
    Operational,
}

/// Location of one topology object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TopologyPath {
    Node {
        layer: NetworkLayer,
        node: NodeId,
    },
    TerminationPoint {
        layer: NetworkLayer,
        node: NodeId,
        tp: TpId,
    },
    Link {
        layer: NetworkLayer,
        link: LinkId,
    },
}

impl TopologyPath {
    pub fn node(layer: NetworkLayer, node: impl Into<NodeId>) -> Self {
        Self::Node {
            layer,
            node: node.into(),
        }
    }

    pub fn termination_point(
        layer: NetworkLayer,
        node: impl Into<NodeId>,
        tp: impl Into<TpId>,
    ) -> Self {
        Self::TerminationPoint {
            layer,
            node: node.into(),
            tp: tp.into(),
        }
    }

    pub fn link(layer: NetworkLayer, link: impl Into<LinkId>) -> Self {
        Self::Link {
            layer,
            link: link.into(),
        }
    }

    pub fn layer(&self) -> NetworkLayer {
        match self {
            Self::Node { layer, .. }
            | Self::TerminationPoint { layer, .. }
            | Self::Link { layer, .. } => *layer,
        }
    }
}

impl fmt::Display for TopologyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { layer, node } => write!(f, "{layer}/node/{node}"),
            Self::TerminationPoint { layer, node, tp } => {
                write!(f, "{layer}/node/{node}/termination-point/{tp}")
            }
            Self::Link { layer, link } => write!(f, "{layer}/link/{link}"),
        }
    }
}

/// Value stored at a [`TopologyPath`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopologyObject {
    Node(Node),
    TerminationPoint(TerminationPoint),
    Link(Link),
}

impl TopologyObject {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::TerminationPoint(_) => "termination-point",
            Self::Link(_) => "link",
        }
    }
}

/// One read-write transaction.
///
/// Writes are staged until [`commit`](Self::commit); reads see the
/// transaction's own staged writes.
pub trait ReadWriteTransaction: Send {
    fn read(
        &mut self,
        store: LogicalDatastore,
        path: &TopologyPath,
    ) -> Result<Option<TopologyObject>, StoreError>;

    /// Every object of one layer, ordered by path
    fn read_layer(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
    ) -> Result<Vec<(TopologyPath, TopologyObject)>, StoreError>;

    /// Combine with the stored object; nodes keep their role and extend
    /// their supporting layers, other objects are replaced
    fn merge(&mut self, store: LogicalDatastore, path: TopologyPath, object: TopologyObject);

    fn put(&mut self, store: LogicalDatastore, path: TopologyPath, object: TopologyObject);

    fn delete(&mut self, store: LogicalDatastore, path: TopologyPath);

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub trait DataBroker: Send + Sync {
    fn new_transaction(&self) -> Box<dyn ReadWriteTransaction>;
}

impl<T: DataBroker + ?Sized> DataBroker for std::sync::Arc<T> {
    fn new_transaction(&self) -> Box<dyn ReadWriteTransaction> {
        (**self).new_transaction()
    }
}

/// Typed reads and writes on top of [`ReadWriteTransaction`].
///
/// Nodes are persisted without their termination points; each termination
/// point lives at its own path so pool updates touch one entry only.
pub trait TopologyTransactionExt: ReadWriteTransaction {
    fn read_link(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
        link: &LinkId,
    ) -> Result<Option<Link>, StoreError> {
        let path = TopologyPath::link(layer, link.clone());
        match self.read(store, &path)? {
            None => Ok(None),
            Some(TopologyObject::Link(link)) => Ok(Some(link)),
            Some(other) => Err(mismatch(&path, "link", &other)),
        }
    }

    fn read_tp(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
        node: &NodeId,
        tp: &TpId,
    ) -> Result<Option<TerminationPoint>, StoreError> {
        let path = TopologyPath::termination_point(layer, node.clone(), tp.clone());
        match self.read(store, &path)? {
            None => Ok(None),
            Some(TopologyObject::TerminationPoint(tp)) => Ok(Some(tp)),
            Some(other) => Err(mismatch(&path, "termination-point", &other)),
        }
    }

    /// Node with its termination points reattached
    fn read_node(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
        node: &NodeId,
    ) -> Result<Option<Node>, StoreError> {
        let path = TopologyPath::node(layer, node.clone());
        let mut stored = match self.read(store, &path)? {
            None => return Ok(None),
            Some(TopologyObject::Node(node)) => node,
            Some(other) => return Err(mismatch(&path, "node", &other)),
        };
        let tps = self
            .read_layer(store, layer)?
            .into_iter()
            .filter_map(|(_, object)| match object {
                TopologyObject::TerminationPoint(tp) if &tp.node_id == node => Some(tp),
                _ => None,
            })
            .collect();
        stored = stored.with_termination_points(tps);
        Ok(Some(stored))
    }

    fn read_links(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
    ) -> Result<Vec<Link>, StoreError> {
        Ok(self
            .read_layer(store, layer)?
            .into_iter()
            .filter_map(|(_, object)| match object {
                TopologyObject::Link(link) => Some(link),
                _ => None,
            })
            .collect())
    }

    /// Nodes of one layer, termination points not attached
    fn read_nodes(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
    ) -> Result<Vec<Node>, StoreError> {
        Ok(self
            .read_layer(store, layer)?
            .into_iter()
            .filter_map(|(_, object)| match object {
                TopologyObject::Node(node) => Some(node),
                _ => None,
            })
            .collect())
    }

    fn merge_node(&mut self, store: LogicalDatastore, layer: NetworkLayer, mut node: Node) {
        let tps = std::mem::take(&mut node.termination_points);
        for tp in tps {
            self.put_tp(store, layer, tp);
        }
        let path = TopologyPath::node(layer, node.id.clone());
        self.merge(store, path, TopologyObject::Node(node));
    }

    fn put_tp(&mut self, store: LogicalDatastore, layer: NetworkLayer, tp: TerminationPoint) {
        let path = TopologyPath::termination_point(layer, tp.node_id.clone(), tp.id.clone());
        self.put(store, path, TopologyObject::TerminationPoint(tp));
    }

    fn put_link(&mut self, store: LogicalDatastore, layer: NetworkLayer, link: Link) {
        let path = TopologyPath::link(layer, link.id.clone());
        self.put(store, path, TopologyObject::Link(link));
    }

    fn merge_link(&mut self, store: LogicalDatastore, layer: NetworkLayer, link: Link) {
        let path = TopologyPath::link(layer, link.id.clone());
        self.merge(store, path, TopologyObject::Link(link));
    }

    fn delete_link(&mut self, store: LogicalDatastore, layer: NetworkLayer, link: &LinkId) {
        self.delete(store, TopologyPath::link(layer, link.clone()));
    }
}

impl<T: ReadWriteTransaction + ?Sized> TopologyTransactionExt for T {}

fn mismatch(path: &TopologyPath, expected: &'static str, found: &TopologyObject) -> StoreError {
    StoreError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}
