//! JWT authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rpa_core::error::CoreError;
use rpa_core::types::DbId;
use rpa_db::repositories::UserRepo;

use crate::auth::cookie::access_token_from_cookies;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller.
///
/// The token is read from `Authorization: Bearer <token>` and, failing that,
/// from the `access_token` cookie set at login. The user is reloaded on every
/// request: a deactivated account is rejected at once and the role is the
/// one currently stored, not the one in the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// Role name (`"admin"`, `"user"` or `"auditor"`).
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        {
            Some(header) => header
                .strip_prefix("Bearer ")
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::Core(CoreError::Unauthorized(
                        "Invalid Authorization format. Expected: Bearer <token>".into(),
                    ))
                })?,
            None => access_token_from_cookies(&parts.headers).ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Not authenticated".into()))
            })?,
        };

        let claims = state.config.jwt.decode_access_token(&token).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let role = UserRepo::active_role(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Account is deactivated or no longer exists".into(),
                ))
            })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }
}
