//! Session-backed identity extractor for API routes

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shared::error::{AppError, ErrorCode};
use shared::models::{Employee, Role};

use super::session::session_id_from_headers;
use crate::error::ServiceError;
use crate::state::AppState;

/// Authenticated, active user behind the request's session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub matricule: String,
    pub role: Role,
    pub session_id: String,
}

impl CurrentUser {
    /// 403 unless the user holds one of `roles`
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        let allowed: Vec<&str> = roles.iter().map(Role::as_str).collect();
        Err(AppError::new(ErrorCode::RoleRequired).with_detail("allowed", allowed.join(",")))
    }

    /// Employee record linked to this account by matricule
    pub async fn employee(&self, state: &AppState) -> Result<Employee, ServiceError> {
        state
            .store
            .find_employee_by_matricule(&self.matricule)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::EmployeeNotLinked)
                    .with_detail("matricule", self.matricule.clone())
                    .into()
            })
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let session_id = session_id_from_headers(&parts.headers, &state.config.session_cookie)
            .ok_or_else(AppError::not_authenticated)?;

        let session = state
            .sessions
            .load(&session_id)
            .await
            .ok_or_else(AppError::session_expired)?;
        let (user_id, _) = session.identity().ok_or_else(AppError::not_authenticated)?;

        let user = state
            .store
            .get_user(user_id)
            .await
            .map_err(|e| AppError::from(ServiceError::from(e)))?
            .ok_or_else(AppError::not_authenticated)?;

        if !user.is_active {
            tracing::warn!(user_id, "Inactive account presented a session");
            return Err(AppError::new(ErrorCode::AccountDisabled));
        }

        Ok(CurrentUser {
            id: user.id,
            matricule: user.matricule,
            role: user.role,
            session_id,
        })
    }
}
