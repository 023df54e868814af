//! Employee Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Employee entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    /// Unique staff number, also the login of the linked user account
    pub matricule: String,
    pub first_name: String,
    pub last_name: String,
    /// Grade label, key into the grade rate table
    pub grade: String,
    pub grade_index: i32,
    pub service: String,
    pub department: String,
    pub entry_date: NaiveDate,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl Employee {
    pub fn summary(&self) -> EmployeeSummary {
        EmployeeSummary {
            matricule: self.matricule.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            department: self.department.clone(),
            service: self.service.clone(),
        }
    }
}

/// Nested employee view embedded in complaint snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub matricule: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub service: String,
}

/// Create employee payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCreate {
    pub matricule: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub grade_index: i32,
    pub service: String,
    pub department: String,
    pub entry_date: NaiveDate,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Partial employee update (admin)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade: Option<String>,
    pub grade_index: Option<i32>,
    pub service: Option<String>,
    pub department: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl EmployeeUpdate {
    /// Whether applying this update to `employee` moves them to another
    /// grade or service
    pub fn changes_position(&self, employee: &Employee) -> bool {
        self.grade.as_ref().is_some_and(|g| *g != employee.grade)
            || self.service.as_ref().is_some_and(|s| *s != employee.service)
    }
}

/// One grade/service assignment in an employee's career
///
/// Exactly one event per employee is current (`end_date` unset).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CareerEvent {
    pub id: i64,
    pub employee_id: i64,
    pub grade: String,
    pub service: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub created_at: i64,
}

/// Profile of the logged-in employee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub employee: Employee,
    /// Sum of `recall_amount` over the employee's salary records
    pub total_due: i64,
    /// Creation time of the most recent salary record
    pub last_update: Option<i64>,
    /// Newest first
    pub career_history: Vec<CareerEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Employee {
        Employee {
            id: 1,
            matricule: "E001".into(),
            first_name: "Ama".into(),
            last_name: "Kodjo".into(),
            grade: "B2".into(),
            grade_index: 3,
            service: "Paie".into(),
            department: "Finance".into(),
            entry_date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
            phone: None,
            email: None,
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn position_change_ignores_unchanged_values() {
        let current = employee();
        let same = EmployeeUpdate {
            grade: Some("B2".into()),
            phone: Some("+228 90 00 00 00".into()),
            ..Default::default()
        };
        assert!(!same.changes_position(&current));

        let promoted = EmployeeUpdate {
            grade: Some("A1".into()),
            ..Default::default()
        };
        assert!(promoted.changes_position(&current));

        let moved = EmployeeUpdate {
            service: Some("Audit".into()),
            ..Default::default()
        };
        assert!(moved.changes_position(&current));
    }
}
