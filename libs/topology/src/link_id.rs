//! Deterministic link identifiers
//!
//! Ids are order-sensitive: swapping source and destination yields the id of
//! the opposite link. Empty node or termination point names are a caller
//! contract violation.

use crate::model::{LinkId, OtnLinkType};

/// `{src_node}-{src_tp}to{dst_node}-{dst_tp}`
pub fn build_link_id(src_node: &str, src_tp: &str, dst_node: &str, dst_tp: &str) -> LinkId {
    debug_assert!(
        !(src_node.is_empty() || src_tp.is_empty() || dst_node.is_empty() || dst_tp.is_empty()),
        "link endpoints must be named"
    );
    LinkId::new(format!("{src_node}-{src_tp}to{dst_node}-{dst_tp}"))
}

/// Id of the reverse-direction link
pub fn opposite_link_id(src_node: &str, src_tp: &str, dst_node: &str, dst_tp: &str) -> LinkId {
    build_link_id(dst_node, dst_tp, src_node, src_tp)
}

/// OTN links prefix the plain id with their layer, e.g. `OTU4-SPDRA-XPDR1-XPDR1-NETWORK1to...`
pub fn build_otn_link_id(
    link_type: OtnLinkType,
    src_node: &str,
    src_tp: &str,
    dst_node: &str,
    dst_tp: &str,
) -> LinkId {
    let plain = build_link_id(src_node, src_tp, dst_node, dst_tp);
    LinkId::new(format!("{}-{}", link_type.name(), plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_link_id() {
        let id = build_link_id("ROADM-A1-DEG2", "DEG2-TTP-TXRX", "ROADM-C1-DEG1", "DEG1-TTP-TXRX");
        assert_eq!(id, "ROADM-A1-DEG2-DEG2-TTP-TXRXtoROADM-C1-DEG1-DEG1-TTP-TXRX");
    }

    #[test]
    fn test_swapping_ends_changes_id() {
        let az = build_link_id("A", "1", "Z", "2");
        let za = build_link_id("Z", "2", "A", "1");
        assert_ne!(az, za);
        assert_eq!(opposite_link_id("A", "1", "Z", "2"), za);
    }

    #[test]
    fn test_otn_link_id() {
        let id = build_otn_link_id(
            OtnLinkType::Otu4,
            "SPDRA-XPDR1",
            "XPDR1-NETWORK1",
            "SPDRZ-XPDR1",
            "XPDR1-NETWORK1",
        );
        assert_eq!(id, "OTU4-SPDRA-XPDR1-XPDR1-NETWORK1toSPDRZ-XPDR1-XPDR1-NETWORK1");
    }
}
