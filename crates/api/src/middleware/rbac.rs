//! Role gates layered on [`AuthUser`]. A wrong role is 403, no token 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rpa_core::error::CoreError;
use rpa_core::roles::{can_run_exports, ROLE_ADMIN};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn authorize(
    parts: &mut Parts,
    state: &AppState,
    allowed: fn(&str) -> bool,
    denial: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if allowed(&user.role) {
        Ok(user)
    } else {
        tracing::debug!(user_id = user.user_id, role = %user.role, "Role not allowed");
        Err(AppError::Core(CoreError::Forbidden(denial.to_string())))
    }
}

/// User management.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        authorize(parts, state, |role| role == ROLE_ADMIN, "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// Starting exports and loading BOMs: `user` or `admin`, never `auditor`.
pub struct RequireOperator(pub AuthUser);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        authorize(parts, state, can_run_exports, "User or Admin role required")
            .await
            .map(RequireOperator)
    }
}
