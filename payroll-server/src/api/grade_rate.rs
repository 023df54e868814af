//! Grade rate endpoints (CNSS/IPTS percentages)

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{GradeRate, GradeRateCreate, GradeRateUpdate, Role};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::payroll::validate_rate;
use crate::state::AppState;

/// GET /api/grade-rates (accountant, admin)
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<GradeRate>> {
    user.require_role(&[Role::Accountant, Role::Admin])?;
    Ok(Json(state.store.list_grade_rates().await?))
}

/// POST /api/grade-rates (accountant)
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut req): Json<GradeRateCreate>,
) -> ApiResult<GradeRate> {
    user.require_role(&[Role::Accountant])?;

    req.grade = req.grade.trim().to_string();
    if req.grade.is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField)
            .with_detail("field", "grade")
            .into());
    }
    validate_rate("cnssRate", req.cnss_rate)?;
    validate_rate("iptsRate", req.ipts_rate)?;

    let rate = state
        .store
        .create_grade_rate(req)
        .await
        .map_err(|e| e.into_app(ErrorCode::GradeRateNotFound, ErrorCode::GradeRateExists))?;
    tracing::info!(grade = %rate.grade, by = user.id, "Grade rate created");
    Ok(Json(rate))
}

/// PUT /api/grade-rates/{id} (accountant)
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(mut req): Json<GradeRateUpdate>,
) -> ApiResult<GradeRate> {
    user.require_role(&[Role::Accountant])?;

    if let Some(grade) = req.grade.as_mut() {
        *grade = grade.trim().to_string();
        if grade.is_empty() {
            return Err(AppError::new(ErrorCode::RequiredField)
                .with_detail("field", "grade")
                .into());
        }
    }
    if let Some(cnss) = req.cnss_rate {
        validate_rate("cnssRate", cnss)?;
    }
    if let Some(ipts) = req.ipts_rate {
        validate_rate("iptsRate", ipts)?;
    }

    let rate = state
        .store
        .update_grade_rate(id, req)
        .await
        .map_err(|e| e.into_app(ErrorCode::GradeRateNotFound, ErrorCode::GradeRateExists))?;
    tracing::info!(grade = %rate.grade, by = user.id, "Grade rate updated");
    Ok(Json(rate))
}

/// DELETE /api/grade-rates/{id} (accountant)
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    user.require_role(&[Role::Accountant])?;
    state
        .store
        .delete_grade_rate(id)
        .await
        .map_err(|e| e.into_app(ErrorCode::GradeRateNotFound, ErrorCode::GradeRateExists))?;
    tracing::info!(grade_rate_id = id, by = user.id, "Grade rate deleted");
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}
