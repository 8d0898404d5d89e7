//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::AppendHeaders;
use axum::Json;
use chrono::Utc;
use rpa_core::error::CoreError;
use rpa_core::roles::{pages_for_role, Page, DEFAULT_ROLE_ID};
use rpa_core::types::DbId;
use rpa_core::validation::{normalize_email, validate_email, validate_password};
use rpa_db::models::session::CreateSession;
use rpa_db::models::user::{CreateUser, User, UserResponse};
use rpa_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{hash_refresh_token, RefreshToken};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

/// `GET /auth/me`: the caller and the pages their role may open.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub pages: &'static [Page],
}

type WithCookie<T> = (AppendHeaders<[(axum::http::HeaderName, String); 1]>, T);

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Self-service sign-up. New accounts get the `user` role.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let email = normalize_email(&input.email);
    validate_email(&email).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_password(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Email already registered".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            name: clean_name(input.name),
            password_hash,
            role_id: DEFAULT_ROLE_ID,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "User registered");

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user, role))))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email and password. Returns both tokens and sets the
/// `access_token` cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<WithCookie<Json<AuthResponse>>> {
    let email = normalize_email(&input.email);
    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
        })?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
        let failures =
            UserRepo::record_failed_login(&state.pool, user.id, MAX_FAILED_ATTEMPTS, lock_until)
                .await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(user_id = user.id, failures, "Account locked after repeated failed logins");
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    tracing::info!(user_id = user.id, role = %role, "User logged in");

    let response = create_auth_response(&state, &user, &role).await?;
    Ok(with_access_cookie(&state, response))
}

/// POST /api/v1/auth/refresh
///
/// Rotate a refresh token. The presented token is consumed in one statement,
/// so replaying it (or racing it) yields 401.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<WithCookie<Json<AuthResponse>>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::consume(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let response = create_auth_response(&state, &user, &role).await?;
    Ok(with_access_cookie(&state, response))
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<WithCookie<StatusCode>> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");

    Ok((
        AppendHeaders([(SET_COOKIE, state.config.cookie.clear_access_cookie())]),
        StatusCode::NO_CONTENT,
    ))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Json<MeResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    let pages = pages_for_role(&auth_user.role);
    Ok(Json(MeResponse {
        user: UserResponse::from_user(&user, auth_user.role),
        pages,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue an access token and a refresh token, persisting the session.
async fn create_auth_response(state: &AppState, user: &User, role: &str) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;
    let access_token = jwt
        .issue_access_token(user.id, role)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let refresh = RefreshToken::generate();
    let expires_at = Utc::now() + jwt.refresh_ttl();

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh.hash,
            expires_at,
            user_agent: None,
            ip_address: None,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh.plaintext,
        expires_in: jwt.access_ttl_secs(),
        user: UserInfo {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: role.to_string(),
        },
    })
}

fn with_access_cookie(state: &AppState, response: AuthResponse) -> WithCookie<Json<AuthResponse>> {
    let cookie = state
        .config
        .cookie
        .access_cookie(&response.access_token, response.expires_in);
    (AppendHeaders([(SET_COOKIE, cookie)]), Json(response))
}

/// Trim a display name; blank becomes `None`.
pub(crate) fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
