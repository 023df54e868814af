//! Shared types for the payroll service
//!
//! Domain models, the live notification wire protocol and the unified
//! error system used by `payroll-server` and its tests.

pub mod error;
pub mod models;
pub mod notify;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use notify::{InboundMessage, NotificationEvent};
