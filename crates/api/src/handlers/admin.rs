//! Handlers for the `/admin` resource (user management).
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rpa_core::error::CoreError;
use rpa_core::roles::DEFAULT_ROLE_ID;
use rpa_core::types::DbId;
use rpa_core::validation::{normalize_email, validate_email, validate_password};
use rpa_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use rpa_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::Deserialize;

use super::auth::clean_name;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::PageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    /// Defaults to the `user` role.
    pub role_id: Option<DbId>,
}

/// Request body for `PUT /admin/users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /admin/users/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let email = normalize_email(&input.email);
    validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_password(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let role_id = input.role_id.unwrap_or(DEFAULT_ROLE_ID);
    ensure_role_exists(&state, role_id).await?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            name: clean_name(input.name),
            password_hash: hashed,
            role_id,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, role_id, admin_id = admin.user_id, "User created");

    let response = user_to_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/admin/users?limit=&offset=
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<UserResponse>>> {
    let (limit, offset) = params.window();
    let users = UserRepo::list(&state.pool, limit, offset).await?;
    let total = UserRepo::count(&state.pool).await?;

    // One roles query instead of one per user.
    let roles = RoleRepo::list(&state.pool).await?;

    let data = users
        .iter()
        .map(|u| {
            let role = roles
                .iter()
                .find(|r| r.id == u.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            UserResponse::from_user(u, role)
        })
        .collect();

    Ok(Json(PageResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let response = user_to_response(&state, &user).await?;
    Ok(Json(response))
}

/// PUT /api/v1/admin/users/{id}
///
/// Update profile fields, role or active flag (not the password).
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let email = match input.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            Some(email)
        }
        None => None,
    };

    if let Some(role_id) = input.role_id {
        ensure_role_exists(&state, role_id).await?;
    }

    if id == admin.user_id && input.is_active == Some(false) {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        )));
    }

    let update_dto = UpdateUser {
        email,
        name: clean_name(input.name),
        role_id: input.role_id,
        is_active: input.is_active,
    };

    let user = UserRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    let response = user_to_response(&state, &user).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft-deactivate a user and revoke their sessions. Returns 204.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        )));
    }

    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, admin_id = admin.user_id, "User deactivated");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Sets a new password, clears any lockout and revokes existing sessions.
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password(&input.new_password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    if !UserRepo::update_password(&state.pool, id, &hashed).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, admin_id = admin.user_id, "Password reset by admin");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user_to_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(UserResponse::from_user(user, role))
}

async fn ensure_role_exists(state: &AppState, role_id: DbId) -> AppResult<()> {
    match RoleRepo::find_by_id(&state.pool, role_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role id {role_id}"
        )))),
    }
}
