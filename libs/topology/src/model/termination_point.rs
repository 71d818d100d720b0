//! Termination points

use super::{NodeId, TpId};
use crate::pool::TpPools;
use serde::{Deserialize, Serialize};

/// Direction capability of a termination point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TpDirection {
    Tx,
    Rx,
    TxRx,
}

impl TpDirection {
    /// Suffix used in ROADM termination point names
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Tx => "TX",
            Self::Rx => "RX",
            Self::TxRx => "TXRX",
        }
    }
}

/// Termination point role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TpType {
    DegreeTxTtp,
    DegreeRxTtp,
    DegreeTxRxTtp,
    DegreeTxRxCtp,
    SrgTxPp,
    SrgRxPp,
    SrgTxRxPp,
    SrgTxRxCp,
    XponderNetwork,
    XponderClient,
}

impl TpType {
    pub fn degree_ttp(direction: TpDirection) -> Self {
        match direction {
            TpDirection::Tx => Self::DegreeTxTtp,
            TpDirection::Rx => Self::DegreeRxTtp,
            TpDirection::TxRx => Self::DegreeTxRxTtp,
        }
    }

    pub fn srg_pp(direction: TpDirection) -> Self {
        match direction {
            TpDirection::Tx => Self::SrgTxPp,
            TpDirection::Rx => Self::SrgRxPp,
            TpDirection::TxRx => Self::SrgTxRxPp,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::XponderNetwork)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::XponderClient)
    }
}

/// Client/network interface capabilities declared by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceCapability {
    If1GeOdu0,
    If10GeOdu2e,
    If10GeOdu2,
    If100GeOdu4,
    If100Ge,
    IfOchOtu4Odu4,
    IfOtsiOtsigroup,
}

impl InterfaceCapability {
    pub fn parse(name: &str) -> Option<Self> {
        let capability = match name {
            "if-1GE-ODU0" => Self::If1GeOdu0,
            "if-10GE-ODU2e" => Self::If10GeOdu2e,
            "if-10GE-ODU2" => Self::If10GeOdu2,
            "if-100GE-ODU4" => Self::If100GeOdu4,
            "if-100GE" => Self::If100Ge,
            "if-OCH-OTU4-ODU4" => Self::IfOchOtu4Odu4,
            "if-otsi-otsigroup" => Self::IfOtsiOtsigroup,
            _ => return None,
        };
        Some(capability)
    }

    /// Whether a termination point with this capability can carry the OTN timeslot pools
    pub fn is_otn_multiplexing(&self) -> bool {
        matches!(self, Self::IfOchOtu4Odu4 | Self::IfOtsiOtsigroup)
    }
}

/// Termination point of a topology node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationPoint {
    /// Owning topology node
    pub node_id: NodeId,
    pub id: TpId,
    pub tp_type: TpType,
    pub direction: TpDirection,
    /// Client/network pairing on transponders, partner port on ROADMs
    pub associated_tp: Option<TpId>,
    pub supported_capabilities: Vec<InterfaceCapability>,
    /// Timeslot and tributary-port-number pools, present once an ODTU4 link terminates here
    pub otn: Option<TpPools>,
}

impl TerminationPoint {
    pub fn new(
        node_id: impl Into<NodeId>,
        id: impl Into<TpId>,
        tp_type: TpType,
        direction: TpDirection,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            id: id.into(),
            tp_type,
            direction,
            associated_tp: None,
            supported_capabilities: Vec::new(),
            otn: None,
        }
    }

    pub fn with_associated_tp(mut self, tp: impl Into<TpId>) -> Self {
        self.associated_tp = Some(tp.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<InterfaceCapability>) -> Self {
        self.supported_capabilities = capabilities;
        self
    }

    pub fn is_otn_capable(&self) -> bool {
        self.tp_type.is_network()
            && self
                .supported_capabilities
                .iter()
                .any(InterfaceCapability::is_otn_multiplexing)
    }
}
