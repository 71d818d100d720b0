//! Layered topology model
//!
//! Nodes, termination points and links of the ROADM and OTN layers, plus the
//! [`TopologyShard`] aggregate returned by every builder and link operation.
//!
//! Links never hold references to each other: the reverse-direction link of
//! a pair is named by its [`LinkId`] in [`Link::opposite_link`] and resolved
//! by lookup.

pub mod link;
pub mod node;
pub mod shard;
pub mod termination_point;

pub use link::{Link, LinkEnd, LinkType, OtnLinkBandwidth, OtnLinkType};
pub use node::{
    NetworkLayer, NonBlockingList, Node, NodeRole, OduSwitchingPool, SupportingNode,
    SwitchingPools,
};
pub use shard::TopologyShard;
pub use termination_point::{InterfaceCapability, TerminationPoint, TpDirection, TpType};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Topology node identifier, e.g. `ROADM-A1-DEG1` or `SPDRA-XPDR1`
    NodeId
);
string_id!(
    /// Termination point identifier, unique within its node
    TpId
);
string_id!(
    /// Deterministic link identifier, see [`crate::link_id`]
    LinkId
);
