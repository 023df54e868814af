//! Salary record endpoints
//!
//! Derived amounts always come from the payroll engine and the employee's
//! current grade rate; a grade without a configured rate blocks the write.

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Employee, EmployeeSalaries, GradeRate, Role, SalaryRecord, SalaryRecordCreate,
    SalaryRecordUpdate,
};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::payroll::{self, report::total_due};
use crate::state::AppState;

async fn load_employee(state: &AppState, id: i64) -> Result<Employee, ServiceError> {
    state.store.get_employee(id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::EmployeeNotFound)
            .with_detail("employeeId", id)
            .into()
    })
}

async fn rate_for(state: &AppState, employee: &Employee) -> Result<GradeRate, ServiceError> {
    let rate = state.store.get_grade_rate(&employee.grade).await?;
    Ok(payroll::require_rate(&employee.grade, rate)?)
}

/// POST /api/salary-records (accountant)
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SalaryRecordCreate>,
) -> ApiResult<SalaryRecord> {
    user.require_role(&[Role::Accountant])?;

    let employee = load_employee(&state, req.employee_id).await?;
    let rate = rate_for(&state, &employee).await?;
    let new_record = payroll::prepare_record(req, &rate, Some(user.id))?;

    let record = state.store.create_salary_record(new_record).await?;
    tracing::info!(
        salary_record_id = record.id,
        employee_id = record.employee_id,
        net_salary = record.net_salary,
        recall_amount = record.recall_amount,
        by = user.id,
        "Salary record created"
    );
    Ok(Json(record))
}

/// PUT /api/salary-records/{id} (accountant)
///
/// 409 unless the record is still at the version read here, or at the one
/// the caller sent.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SalaryRecordUpdate>,
) -> ApiResult<SalaryRecord> {
    user.require_role(&[Role::Accountant])?;

    let existing = state
        .store
        .get_salary_record(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SalaryRecordNotFound))?;
    if let Some(seen) = req.version
        && seen != existing.version
    {
        return Err(AppError::new(ErrorCode::ConcurrentModification)
            .with_detail("version", existing.version)
            .into());
    }
    let employee = load_employee(&state, existing.employee_id).await?;
    let rate = rate_for(&state, &employee).await?;

    let merged = payroll::apply_update(existing, req, &rate)?;
    let record = state
        .store
        .update_salary_record(merged)
        .await
        .map_err(|e| e.into_app(ErrorCode::SalaryRecordNotFound, ErrorCode::AlreadyExists))?;
    tracing::info!(salary_record_id = id, by = user.id, "Salary record updated");
    Ok(Json(record))
}

/// GET /api/salary-records (accountant, admin)
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<SalaryRecord>> {
    user.require_role(&[Role::Accountant, Role::Admin])?;
    Ok(Json(state.store.list_salary_records().await?))
}

/// GET /api/salary-records/employee/{matricule}
///
/// Employees may only read their own history.
pub async fn list_for_matricule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(matricule): Path<String>,
) -> ApiResult<Vec<SalaryRecord>> {
    if user.role == Role::Employee && user.matricule != matricule {
        return Err(AppError::permission_denied("Employees can only view their own salaries").into());
    }

    let employee = state
        .store
        .find_employee_by_matricule(&matricule)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::EmployeeNotFound).with_detail("matricule", matricule.clone())
        })?;
    Ok(Json(
        state
            .store
            .list_salary_records_for_employee(employee.id)
            .await?,
    ))
}

/// GET /api/employees/me/salaries (employee)
pub async fn my_salaries(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<EmployeeSalaries> {
    user.require_role(&[Role::Employee])?;
    let employee = user.employee(&state).await?;
    let records = state
        .store
        .list_salary_records_for_employee(employee.id)
        .await?;
    let total_due = total_due(&records);
    Ok(Json(EmployeeSalaries { records, total_due }))
}
