//! Employee directory endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CareerEvent, Employee, EmployeeCreate, EmployeeProfile, EmployeeUpdate, Role,
};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::payroll::report::total_due;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn required(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField).with_detail("field", field));
    }
    Ok(())
}

fn store_error(e: crate::db::StoreError) -> AppError {
    e.into_app(ErrorCode::EmployeeNotFound, ErrorCode::MatriculeExists)
}

/// Employee by matricule; employees may only look themselves up
async fn visible_employee(
    state: &AppState,
    user: &CurrentUser,
    matricule: &str,
) -> Result<Employee, ServiceError> {
    if user.role == Role::Employee && user.matricule != matricule {
        return Err(AppError::permission_denied("Employees can only view their own record").into());
    }
    state
        .store
        .find_employee_by_matricule(matricule)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::EmployeeNotFound)
                .with_detail("matricule", matricule.to_string())
                .into()
        })
}

async fn warn_if_unrated(state: &AppState, employee: &Employee) -> Result<(), ServiceError> {
    // Salary records for this grade would fail until a rate exists
    if state.store.get_grade_rate(&employee.grade).await?.is_none() {
        tracing::warn!(grade = %employee.grade, matricule = %employee.matricule, "Employee grade has no contribution rate");
    }
    Ok(())
}

/// GET /api/employees (admin, accountant)
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Employee>> {
    user.require_role(&[Role::Admin, Role::Accountant])?;
    Ok(Json(state.store.list_employees().await?))
}

/// POST /api/employees (admin)
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut req): Json<EmployeeCreate>,
) -> ApiResult<Employee> {
    user.require_role(&[Role::Admin])?;

    req.matricule = req.matricule.trim().to_string();
    required("matricule", &req.matricule)?;
    required("grade", &req.grade)?;
    required("department", &req.department)?;

    let employee = state.store.create_employee(req).await.map_err(store_error)?;
    warn_if_unrated(&state, &employee).await?;

    tracing::info!(employee_id = employee.id, by = user.id, "Employee created");
    Ok(Json(employee))
}

/// GET /api/employees/{matricule}
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(matricule): Path<String>,
) -> ApiResult<Employee> {
    Ok(Json(visible_employee(&state, &user, &matricule).await?))
}

/// PUT /api/employees/{id} (admin)
///
/// A grade or service change is recorded in the career history as of today.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<EmployeeUpdate>,
) -> ApiResult<Employee> {
    user.require_role(&[Role::Admin])?;

    for (field, value) in [
        ("grade", &req.grade),
        ("service", &req.service),
        ("department", &req.department),
    ] {
        if let Some(value) = value {
            required(field, value)?;
        }
    }

    let today = chrono::Utc::now().date_naive();
    let employee = state
        .store
        .update_employee(id, req, today)
        .await
        .map_err(store_error)?;
    warn_if_unrated(&state, &employee).await?;

    tracing::info!(employee_id = id, by = user.id, "Employee updated");
    Ok(Json(employee))
}

/// DELETE /api/employees/{id} (admin)
///
/// Refused with 409 while salary records or complaints reference the employee.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    user.require_role(&[Role::Admin])?;
    state.store.delete_employee(id).await.map_err(store_error)?;
    tracing::info!(employee_id = id, by = user.id, "Employee deleted");
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

/// GET /api/employees/departments
pub async fn departments(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Vec<String>> {
    Ok(Json(state.store.employee_departments().await?))
}

/// GET /api/employees/search?q= (admin, accountant); blank `q` matches nothing
pub async fn search(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Employee>> {
    user.require_role(&[Role::Admin, Role::Accountant])?;
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(state.store.search_employees(q).await?))
}

/// GET /api/employees/me (employee)
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<EmployeeProfile> {
    user.require_role(&[Role::Employee])?;
    let employee = user.employee(&state).await?;
    let records = state
        .store
        .list_salary_records_for_employee(employee.id)
        .await?;
    let career_history = state.store.career_history(employee.id).await?;

    Ok(Json(EmployeeProfile {
        total_due: total_due(&records),
        last_update: records.iter().map(|r| r.created_at).max(),
        career_history,
        employee,
    }))
}

/// GET /api/career-history/{matricule}
pub async fn career_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(matricule): Path<String>,
) -> ApiResult<Vec<CareerEvent>> {
    let employee = visible_employee(&state, &user, &matricule).await?;
    Ok(Json(state.store.career_history(employee.id).await?))
}
