//! payroll-server: payroll/HR service with live complaint notifications
//!
//! - HTTP API (cookie sessions, role guards) over a [`db::PayrollStore`]
//! - Payroll computation engine and dashboard aggregation ([`payroll`])
//! - Session-gated WebSocket endpoint with a connection registry ([`live`])

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod live;
pub mod payroll;
pub mod state;
pub mod util;

pub use config::Config;
pub use state::AppState;
