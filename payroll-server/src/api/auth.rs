//! Session endpoints: login, logout, current user

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use shared::error::{AppError, ErrorCode};
use shared::models::{LoginRequest, UserSummary};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::verify_password;

/// `Set-Cookie` value for the session cookie; `max_age` 0 clears it
fn session_cookie(state: &AppState, value: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
        state.config.session_cookie
    );
    if state.config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ServiceError> {
    let user = state
        .store
        .find_user_by_matricule(req.matricule.trim())
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        tracing::info!(matricule = %user.matricule, "Login failed: wrong password");
        return Err(AppError::invalid_credentials().into());
    }

    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled).into());
    }

    let session = state.sessions.create(&user).await;
    let cookie = session_cookie(&state, &session.session_id, state.config.session_ttl.as_secs());
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(([(header::SET_COOKIE, cookie)], Json(user.summary())).into_response())
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> Response {
    state.sessions.destroy(&user.session_id).await;
    let cookie = session_cookie(&state, "", 0);
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "loggedOut": true })),
    )
        .into_response()
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<UserSummary> {
    let account = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(account.summary()))
}
