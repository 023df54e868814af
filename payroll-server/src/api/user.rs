//! Account administration (admin only)

use axum::Json;
use axum::extract::{Path, Query, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    PasswordReset, Role, User, UserCreate, UserPage, UserQuery, UserSummary, UserUpdate,
};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::{NewUser, UserChanges};
use crate::state::AppState;
use crate::util::{generate_password, hash_password};

const MIN_PASSWORD_LEN: usize = 8;
const GENERATED_PASSWORD_LEN: usize = 12;

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .with_detail("field", "password"));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Password hashing failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })
}

fn store_error(e: crate::db::StoreError) -> AppError {
    e.into_app(ErrorCode::UserNotFound, ErrorCode::MatriculeExists)
}

/// GET /api/users?page=&limit=&search=&sortBy=&sortDesc=
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<UserQuery>,
) -> ApiResult<UserPage> {
    user.require_role(&[Role::Admin])?;
    let query = query.normalized();
    let (items, total) = state.store.list_users(&query).await?;
    Ok(Json(UserPage {
        items,
        total,
        page: query.page,
        limit: query.limit,
    }))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UserCreate>,
) -> ApiResult<UserSummary> {
    user.require_role(&[Role::Admin])?;

    let matricule = req.matricule.trim().to_string();
    if matricule.is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField)
            .with_detail("field", "matricule")
            .into());
    }
    check_password(&req.password)?;

    let created = state
        .store
        .create_user(NewUser {
            matricule,
            password_hash: hash(&req.password)?,
            role: req.role,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            email: req.email,
        })
        .await
        .map_err(store_error)?;

    tracing::info!(user_id = created.id, role = %created.role, by = user.id, "User account created");
    Ok(Json(created.summary()))
}

/// PUT /api/users/{id}
///
/// Admins cannot demote or deactivate themselves.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdate>,
) -> ApiResult<User> {
    user.require_role(&[Role::Admin])?;

    if id == user.id
        && (req.role.is_some_and(|r| r != Role::Admin) || req.is_active == Some(false))
    {
        return Err(AppError::new(ErrorCode::SelfModificationDenied).into());
    }
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            check_password(password)?;
            Some(hash(password)?)
        }
        None => None,
    };

    let updated = state
        .store
        .update_user(
            id,
            UserChanges {
                role: req.role,
                first_name: req.first_name,
                last_name: req.last_name,
                phone: req.phone,
                email: req.email,
                is_active: req.is_active,
                password_hash,
            },
        )
        .await
        .map_err(store_error)?;

    tracing::info!(user_id = id, by = user.id, "User account updated");
    Ok(Json(updated))
}

/// DELETE /api/users/{id}
///
/// Accounts that created salary records or resolved complaints are kept
/// (409); deactivate them instead.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    user.require_role(&[Role::Admin])?;
    if id == user.id {
        return Err(AppError::new(ErrorCode::SelfModificationDenied).into());
    }
    state.store.delete_user(id).await.map_err(store_error)?;
    tracing::info!(user_id = id, by = user.id, "User account deleted");
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

/// POST /api/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<PasswordReset> {
    user.require_role(&[Role::Admin])?;

    let password = generate_password(GENERATED_PASSWORD_LEN);
    let updated = state
        .store
        .update_user(
            id,
            UserChanges {
                password_hash: Some(hash(&password)?),
                ..Default::default()
            },
        )
        .await
        .map_err(store_error)?;

    tracing::info!(user_id = id, by = user.id, "User password reset");
    Ok(Json(PasswordReset {
        user: updated.summary(),
        password,
    }))
}
