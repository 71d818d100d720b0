//! Directed links

use super::{LinkId, NodeId, TpId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OTN link sub-types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtnLinkType {
    Otu4,
    Odu4,
    /// ODU4 tributary-unit layer carrying the timeslot pools
    Odtu4,
    Odu2e,
    Odu2,
    Odu1,
    Odu0,
}

impl OtnLinkType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Otu4 => "OTU4",
            Self::Odu4 => "ODU4",
            Self::Odtu4 => "ODTU4",
            Self::Odu2e => "ODU2e",
            Self::Odu2 => "ODU2",
            Self::Odu1 => "ODU1",
            Self::Odu0 => "ODU0",
        }
    }

    /// Line capacity in Mb/s
    pub fn capacity_mbps(&self) -> u32 {
        match self {
            Self::Otu4 | Self::Odu4 | Self::Odtu4 => 100_000,
            Self::Odu2e | Self::Odu2 => 10_000,
            Self::Odu1 => 2_500,
            Self::Odu0 => 1_000,
        }
    }
}

impl fmt::Display for OtnLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    RoadmToRoadm,
    ExpressLink,
    AddLink,
    DropLink,
    XponderInput,
    XponderOutput,
    OtnLink(OtnLinkType),
}

impl LinkType {
    pub fn otn_link_type(&self) -> Option<OtnLinkType> {
        match self {
            Self::OtnLink(otn) => Some(*otn),
            _ => None,
        }
    }
}

/// Available / used bandwidth of an OTN link in Mb/s.
///
/// `available + used` is the link capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtnLinkBandwidth {
    pub available: u32,
    pub used: u32,
}

impl OtnLinkBandwidth {
    /// Fresh link: whole capacity available
    pub fn unused(capacity: u32) -> Self {
        Self {
            available: capacity,
            used: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.available + self.used
    }

    /// Move `amount` from available to used
    pub fn consume(&self, amount: u32) -> Option<Self> {
        Some(Self {
            available: self.available.checked_sub(amount)?,
            used: self.used.checked_add(amount)?,
        })
    }

    /// Move `amount` from used back to available
    pub fn restore(&self, amount: u32) -> Option<Self> {
        Some(Self {
            available: self.available.checked_add(amount)?,
            used: self.used.checked_sub(amount)?,
        })
    }
}

/// One end of a directed link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEnd {
    pub node: NodeId,
    pub tp: TpId,
}

impl LinkEnd {
    pub fn new(node: impl Into<NodeId>, tp: impl Into<TpId>) -> Self {
        Self {
            node: node.into(),
            tp: tp.into(),
        }
    }
}

/// Directed (A to Z) link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: LinkEnd,
    pub destination: LinkEnd,
    pub link_type: LinkType,
    /// Reverse-direction link of the pair
    pub opposite_link: Option<LinkId>,
    /// OTN bandwidth; absent on non-OTN links and on malformed OTN links
    pub bandwidth: Option<OtnLinkBandwidth>,
}

impl Link {
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source.node == node || &self.destination.node == node
    }
}
