//! User entity model and DTOs.

use rpa_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Carries the password hash, so it is never serialized. Use
/// [`UserResponse`] for anything leaving the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role_id: DbId,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
    /// Resolved role name (`"admin"`, `"user"` or `"auditor"`).
    pub role: String,
    pub role_id: DbId,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserResponse {
    pub fn from_user(user: &User, role: String) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role,
            role_id: user.role_id,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role_id: DbId,
}

/// Patch for an existing user. `None` fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: Option<bool>,
}
