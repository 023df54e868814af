//! Complaint lifecycle endpoints
//!
//! Every successful mutation is persisted first, then pushed to admin
//! connections as a hydrated snapshot (complaint + employee summary).

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Complaint, ComplaintCreate, ComplaintStatus, ComplaintStatusUpdate, ComplaintUpdate,
    ComplaintWithEmployee, Employee, Role,
};
use shared::util::now_millis;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::{ComplaintEdit, NewComplaint, StatusChange, StoreError};
use crate::error::ServiceError;
use crate::payroll::PayrollError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ComplaintStatus>,
}

fn check_period(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(PayrollError::InvalidPeriod { start, end }.into());
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField)
            .with_detail("field", field)
            .into());
    }
    Ok(())
}

async fn load(state: &AppState, id: i64) -> Result<Complaint, ServiceError> {
    state.store.get_complaint(id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::ComplaintNotFound)
            .with_detail("complaintId", id)
            .into()
    })
}

/// Map a lost conditional write to the state the complaint is now in
async fn lost_race(state: &AppState, id: i64, err: StoreError) -> ServiceError {
    if !matches!(err, StoreError::Conflict(_)) {
        return err.into_app(ErrorCode::ComplaintNotFound, ErrorCode::AlreadyExists).into();
    }
    match state.store.get_complaint(id).await {
        Ok(Some(current)) if current.status.is_terminal() => {
            AppError::new(ErrorCode::ComplaintAlreadyResolved).into()
        }
        Ok(Some(current)) => AppError::new(ErrorCode::ComplaintInvalidTransition)
            .with_detail("from", current.status.as_str())
            .into(),
        Ok(None) => AppError::new(ErrorCode::ComplaintNotFound)
            .with_detail("complaintId", id)
            .into(),
        Err(e) => e.into(),
    }
}

async fn hydrate(state: &AppState, complaint: Complaint) -> Result<ComplaintWithEmployee, ServiceError> {
    let employee = state
        .store
        .get_employee(complaint.employee_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::EmployeeNotFound))?;
    Ok(ComplaintWithEmployee {
        complaint,
        employee: employee.summary(),
    })
}

/// Complaint owned by the caller's linked employee and still editable
async fn load_owned(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
) -> Result<(Employee, Complaint), ServiceError> {
    user.require_role(&[Role::Employee])?;
    let employee = user.employee(state).await?;
    let complaint = load(state, id).await?;
    if complaint.employee_id != employee.id {
        return Err(AppError::new(ErrorCode::ComplaintNotOwned).into());
    }
    if complaint.status.is_terminal() {
        return Err(AppError::new(ErrorCode::ComplaintAlreadyResolved).into());
    }
    Ok((employee, complaint))
}

/// POST /api/complaints (employee)
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ComplaintCreate>,
) -> ApiResult<ComplaintWithEmployee> {
    user.require_role(&[Role::Employee])?;
    let employee = user.employee(&state).await?;

    require_text("type", &req.complaint_type)?;
    require_text("description", &req.description)?;
    check_period(req.period_start, req.period_end)?;

    let complaint = state
        .store
        .create_complaint(NewComplaint {
            employee_id: employee.id,
            complaint_type: req.complaint_type.trim().to_string(),
            description: req.description,
            period_start: req.period_start,
            period_end: req.period_end,
            attachments: req.attachments,
        })
        .await?;
    tracing::info!(complaint_id = complaint.id, employee_id = employee.id, "Complaint filed");

    let snapshot = ComplaintWithEmployee {
        complaint,
        employee: employee.summary(),
    };
    state.notifier.complaint_created(snapshot.clone()).await;
    Ok(Json(snapshot))
}

/// GET /api/complaints?status= (admin)
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ComplaintWithEmployee>> {
    user.require_role(&[Role::Admin])?;

    let complaints = state.store.list_complaints(query.status).await?;
    let employees: HashMap<i64, Employee> = state
        .store
        .list_employees()
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    let hydrated = complaints
        .into_iter()
        .filter_map(|complaint| match employees.get(&complaint.employee_id) {
            Some(employee) => Some(ComplaintWithEmployee {
                employee: employee.summary(),
                complaint,
            }),
            None => {
                tracing::warn!(complaint_id = complaint.id, "Complaint references missing employee");
                None
            }
        })
        .collect();
    Ok(Json(hydrated))
}

/// GET /api/complaints/me (employee)
pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Complaint>> {
    user.require_role(&[Role::Employee])?;
    let employee = user.employee(&state).await?;
    Ok(Json(
        state.store.list_complaints_for_employee(employee.id).await?,
    ))
}

/// PATCH /api/complaints/{id} (owner, not resolved)
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ComplaintUpdate>,
) -> ApiResult<ComplaintWithEmployee> {
    let (employee, current) = load_owned(&state, &user, id).await?;

    let mut edit = ComplaintEdit {
        complaint_type: current.complaint_type,
        description: current.description,
        period_start: current.period_start,
        period_end: current.period_end,
        attachments: current.attachments,
    };
    if let Some(kind) = req.complaint_type {
        require_text("type", &kind)?;
        edit.complaint_type = kind.trim().to_string();
    }
    if let Some(description) = req.description {
        require_text("description", &description)?;
        edit.description = description;
    }
    if let Some(start) = req.period_start {
        edit.period_start = start;
    }
    if let Some(end) = req.period_end {
        edit.period_end = end;
    }
    if let Some(attachments) = req.attachments {
        edit.attachments = attachments;
    }
    check_period(edit.period_start, edit.period_end)?;

    let complaint = match state.store.update_complaint(id, edit).await {
        Ok(complaint) => complaint,
        Err(e) => return Err(lost_race(&state, id, e).await),
    };
    tracing::info!(complaint_id = id, "Complaint edited by owner");

    let snapshot = ComplaintWithEmployee {
        complaint,
        employee: employee.summary(),
    };
    state.notifier.complaint_updated(snapshot.clone()).await;
    Ok(Json(snapshot))
}

/// DELETE /api/complaints/{id} (owner, not resolved)
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    load_owned(&state, &user, id).await?;
    if let Err(e) = state.store.delete_complaint(id).await {
        return Err(lost_race(&state, id, e).await);
    }
    tracing::info!(complaint_id = id, "Complaint withdrawn");

    state.notifier.complaint_deleted(id).await;
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

/// Apply an admin status change; `resolved` stamps who and when
///
/// The write is conditional on the status read here, so of two racing
/// resolutions exactly one lands and notifies.
async fn transition(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    next: ComplaintStatus,
) -> Result<ComplaintWithEmployee, ServiceError> {
    user.require_role(&[Role::Admin])?;

    let current = load(state, id).await?;
    if current.status.is_terminal() {
        return Err(AppError::new(ErrorCode::ComplaintAlreadyResolved).into());
    }
    if !current.status.can_transition_to(next) {
        return Err(AppError::new(ErrorCode::ComplaintInvalidTransition)
            .with_detail("from", current.status.as_str())
            .with_detail("to", next.as_str())
            .into());
    }

    let resolving = next == ComplaintStatus::Resolved;
    let change = StatusChange {
        from: current.status,
        to: next,
        resolved_at: resolving.then(now_millis),
        resolved_by: resolving.then_some(user.id),
    };
    let complaint = match state.store.set_complaint_status(id, change).await {
        Ok(complaint) => complaint,
        Err(e) => return Err(lost_race(state, id, e).await),
    };
    tracing::info!(complaint_id = id, status = next.as_str(), by = user.id, "Complaint status changed");

    let snapshot = hydrate(state, complaint).await?;
    state.notifier.complaint_updated(snapshot.clone()).await;
    Ok(snapshot)
}

/// PUT /api/complaints/{id}/status (admin)
pub async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ComplaintStatusUpdate>,
) -> ApiResult<ComplaintWithEmployee> {
    Ok(Json(transition(&state, &user, id, req.status).await?))
}

/// PUT /api/complaints/{id}/resolve (admin)
pub async fn resolve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ComplaintWithEmployee> {
    Ok(Json(
        transition(&state, &user, id, ComplaintStatus::Resolved).await?,
    ))
}
