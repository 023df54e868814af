//! Live notification subsystem
//!
//! - [`UpgradeGate`]: path → protocol → session checks for `/ws`
//! - [`ConnectionRegistry`]: the single owner of open connections
//! - [`Notifier`]: typed complaint events for admin connections
//! - [`inbound`]: client message validation

pub mod gate;
pub mod inbound;
pub mod notifier;
pub mod registry;

pub use gate::{Admission, UpgradeGate, UpgradeRejection, WsAuthMode};
pub use notifier::Notifier;
pub use registry::{
    BroadcastReport, ConnectionId, ConnectionInfo, ConnectionRegistry, DeliveryFailure, Outbound,
    Registration, SweepReport,
};
