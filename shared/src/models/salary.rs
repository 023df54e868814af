//! Salary record model (one payroll period for one employee)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Settlement state of a salary record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

/// Salary record entity
///
/// `cnss_amount`, `ipts_amount`, `net_salary` and `recall_amount` are derived
/// by the payroll engine and never accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    pub id: i64,
    pub employee_id: i64,
    /// Free-form label, e.g. "Jan-Feb 2024"
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i32,
    pub base_salary: i64,
    pub allowance: i64,
    pub cnss_amount: i64,
    pub ipts_amount: i64,
    pub net_salary: i64,
    /// Signed: positive means arrears owed to the employee
    pub recall_amount: i64,
    pub liquidated_amount: i64,
    pub payment_status: PaymentStatus,
    pub observations: Option<String>,
    pub created_at: i64,
    pub created_by: Option<i64>,
    /// Starts at 1, bumped by every update
    pub version: i32,
}

/// Create salary record payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecordCreate {
    pub employee_id: i64,
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub base_salary: i64,
    #[serde(default)]
    pub allowance: i64,
    #[serde(default)]
    pub liquidated_amount: i64,
    pub payment_status: Option<PaymentStatus>,
    pub observations: Option<String>,
}

/// Update salary record payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecordUpdate {
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub base_salary: Option<i64>,
    pub allowance: Option<i64>,
    pub liquidated_amount: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub observations: Option<String>,
    /// Version the caller last read; a mismatch is refused with 409
    pub version: Option<i32>,
}

/// An employee's own salary history with the outstanding balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSalaries {
    pub records: Vec<SalaryRecord>,
    /// Sum of `recall_amount` over all records
    pub total_due: i64,
}
