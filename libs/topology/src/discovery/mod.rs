//! ROADM neighbor discovery
//!
//! One generic component handles every device model revision; revision
//! differences are carried by a [`ProtocolDescriptor`].

pub mod device;
pub mod r2r;

pub use device::{
    DeviceAccess, DeviceError, LldpNeighbor, LldpNeighbors, NotificationKind, ProtocolDescriptor,
    PROTOCOLS,
};
pub use r2r::{LldpChange, R2RLinkDiscovery};
