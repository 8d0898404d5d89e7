//! Seeded roles (`admin`, `user`, `auditor`). Read-only at runtime.

use rpa_core::types::DbId;
use sqlx::PgPool;

use crate::models::role::Role;

pub struct RoleRepo;

impl RoleRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at, updated_at FROM roles ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Name of `role_id`; `"unknown"` for an id with no row.
    pub async fn resolve_name(pool: &PgPool, role_id: DbId) -> Result<String, sqlx::Error> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(pool)
            .await?;
        Ok(name.unwrap_or_else(|| "unknown".to_owned()))
    }
}
