//! Data models
//!
//! Shared between payroll-server and the web client (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Money is `i64` in the smallest currency unit; rates are `f64` percentages.

pub mod complaint;
pub mod employee;
pub mod grade_rate;
pub mod salary;
pub mod user;

// Re-exports
pub use complaint::*;
pub use employee::*;
pub use grade_rate::*;
pub use salary::*;
pub use user::*;
