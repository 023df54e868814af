//! Dashboard aggregates

use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use shared::models::{ComplaintStatus, Employee, Role};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::payroll::report::{self, AccountantStats, PayrollReport};
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_employees: u64,
    pub active_employees: u64,
    /// Employees created during the current calendar month
    pub new_employees: u64,
    pub total_complaints: u64,
    pub pending_complaints: u64,
    pub in_progress_complaints: u64,
    pub resolved_complaints: u64,
    pub departments: Vec<DepartmentCount>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeGrowth {
    pub year: i32,
    /// `YYYY-MM`, January first
    pub months: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PayrollQuery {
    pub year: Option<i32>,
}

fn created_month(employee: &Employee) -> Option<(i32, u32)> {
    DateTime::<Utc>::from_timestamp_millis(employee.created_at).map(|t| (t.year(), t.month()))
}

/// Employees created per calendar month (UTC) of `year`
pub fn growth_by_month(employees: &[Employee], year: i32) -> EmployeeGrowth {
    let mut counts = vec![0u64; 12];
    for (y, m) in employees.iter().filter_map(created_month) {
        if y == year {
            counts[(m - 1) as usize] += 1;
        }
    }
    EmployeeGrowth {
        year,
        months: (1..=12).map(|m| format!("{year:04}-{m:02}")).collect(),
        counts,
    }
}

/// Employee head count per department, sorted by name
pub fn department_counts(employees: &[Employee]) -> Vec<DepartmentCount> {
    let mut by_department: BTreeMap<&str, u64> = BTreeMap::new();
    for employee in employees {
        *by_department.entry(employee.department.as_str()).or_default() += 1;
    }
    by_department
        .into_iter()
        .map(|(name, count)| DepartmentCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// GET /api/dashboard/stats (admin)
pub async fn stats(State(state): State<AppState>, user: CurrentUser) -> ApiResult<DashboardStats> {
    user.require_role(&[Role::Admin])?;

    let employees = state.store.list_employees().await?;
    let complaints = state.store.list_complaints(None).await?;

    let now = Utc::now();
    let this_month = (now.year(), now.month());
    let count_status = |status: ComplaintStatus| {
        complaints.iter().filter(|c| c.status == status).count() as u64
    };

    Ok(Json(DashboardStats {
        total_employees: employees.len() as u64,
        active_employees: employees.iter().filter(|e| e.is_active).count() as u64,
        new_employees: employees
            .iter()
            .filter(|e| created_month(e) == Some(this_month))
            .count() as u64,
        total_complaints: complaints.len() as u64,
        pending_complaints: count_status(ComplaintStatus::Pending),
        in_progress_complaints: count_status(ComplaintStatus::InProgress),
        resolved_complaints: count_status(ComplaintStatus::Resolved),
        departments: department_counts(&employees),
    }))
}

/// GET /api/dashboard/accountant-stats (accountant)
pub async fn accountant_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<AccountantStats> {
    user.require_role(&[Role::Accountant])?;
    let records = state.store.list_salary_records().await?;
    Ok(Json(report::accountant_stats(&records)))
}

/// GET /api/dashboard/payroll?year= (accountant, admin)
pub async fn payroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PayrollQuery>,
) -> ApiResult<PayrollReport> {
    user.require_role(&[Role::Accountant, Role::Admin])?;

    let records = state.store.list_salary_records().await?;
    let departments: HashMap<i64, String> = state
        .store
        .list_employees()
        .await?
        .into_iter()
        .map(|e| (e.id, e.department))
        .collect();
    Ok(Json(report::consolidate(&records, &departments, query.year)))
}

/// GET /api/dashboard/employee-growth/{year} (admin)
pub async fn employee_growth(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(year): Path<i32>,
) -> ApiResult<EmployeeGrowth> {
    user.require_role(&[Role::Admin])?;
    if !(1970..=9999).contains(&year) {
        return Err(AppError::validation(format!("year out of range: {year}")).into());
    }
    let employees = state.store.list_employees().await?;
    Ok(Json(growth_by_month(&employees, year)))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn employee(id: i64, department: &str, created_at: i64) -> Employee {
        Employee {
            id,
            matricule: format!("E{id}"),
            first_name: "F".into(),
            last_name: "L".into(),
            grade: "B2".into(),
            grade_index: 1,
            service: "S".into(),
            department: department.into(),
            entry_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            phone: None,
            email: None,
            is_active: true,
            created_at,
        }
    }

    #[test]
    fn growth_counts_by_creation_month() {
        // 2024-01-15, 2024-01-31, 2024-03-01, 2023-12-31 (UTC)
        let employees = vec![
            employee(1, "A", 1_705_276_800_000),
            employee(2, "A", 1_706_659_200_000),
            employee(3, "B", 1_709_251_200_000),
            employee(4, "B", 1_704_000_000_000),
        ];
        let growth = growth_by_month(&employees, 2024);
        assert_eq!(growth.counts[0], 2);
        assert_eq!(growth.counts[1], 0);
        assert_eq!(growth.counts[2], 1);
        assert_eq!(growth.counts.iter().sum::<u64>(), 3);
        assert_eq!(growth.months[0], "2024-01");
        assert_eq!(growth.months[11], "2024-12");
    }

    #[test]
    fn departments_sorted_by_name() {
        let employees = vec![
            employee(1, "RH", 0),
            employee(2, "Finance", 0),
            employee(3, "RH", 0),
        ];
        assert_eq!(
            department_counts(&employees),
            vec![
                DepartmentCount {
                    name: "Finance".into(),
                    count: 1
                },
                DepartmentCount {
                    name: "RH".into(),
                    count: 2
                },
            ]
        );
    }
}
