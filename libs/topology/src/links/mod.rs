//! Link synthesis
//!
//! - [`roadm`]: ROADM-to-ROADM, express, add/drop and xponder input/output links
//! - [`otn`]: OTU4/ODTU4 link creation, bandwidth updates and teardown
//!
//! Every physical or OTN adjacency is two directed links naming each other as
//! opposite.

pub mod otn;
pub mod roadm;

pub use otn::{
    create_odtu4_links, create_otn_links, delete_otn_links, update_otn_links,
    update_otn_links_bandwidth, xpdr_topology_node,
};
pub use roadm::{create_r2r_links, create_xpdr_rdm_links, DegreeEnd, XpdrRdmRequest};
