//! Topology shard: the result aggregate of one builder or link-engine call

use super::{Link, Node, TerminationPoint};
use serde::{Deserialize, Serialize};

/// Transient, never persisted as such.
///
/// Either a coherent result or fully empty: a failed operation returns
/// [`TopologyShard::empty`], so any populated field means success.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyShard {
    pub nodes: Option<Vec<Node>>,
    pub links: Option<Vec<Link>>,
    pub tps: Option<Vec<TerminationPoint>>,
}

impl TopologyShard {
    /// Failure sentinel
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_tps(mut self, tps: Vec<TerminationPoint>) -> Self {
        self.tps = Some(tps);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_none() && self.links.is_none() && self.tps.is_none()
    }

    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }

    pub fn links(&self) -> &[Link] {
        self.links.as_deref().unwrap_or_default()
    }

    pub fn tps(&self) -> &[TerminationPoint] {
        self.tps.as_deref().unwrap_or_default()
    }
}
