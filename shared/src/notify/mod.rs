//! Live notification protocol
//!
//! Server → Client: [`NotificationEvent`] (one JSON object per text frame)
//! Client → Server: [`InboundMessage`]

pub mod ws;

pub use ws::{InboundMessage, NotificationEvent};
