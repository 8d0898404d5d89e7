//! Repository for the `users` table.

use rpa_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User};

/// Column list shared across queries.
const COLUMNS: &str = "id, email, name, password_hash, role_id, is_active, \
                        last_login_at, failed_login_count, locked_until, created_at, updated_at";

/// CRUD operations for user accounts.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// Fails with a unique violation on `uq_users_email` if the email is taken.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name, password_hash, role_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.password_hash)
            .bind(input.role_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current role name of an active user; `None` when the user is missing
    /// or deactivated.
    pub async fn active_role(pool: &PgPool, id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT r.name FROM users u
             JOIN roles r ON r.id = u.role_id
             WHERE u.id = $1 AND u.is_active = true",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Find a user by email. Callers normalize the email to lowercase first.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List users, most recently created first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Apply the non-`None` fields of `input`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                role_id = COALESCE($4, role_id),
                is_active = COALESCE($5, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.name)
            .bind(input.role_id)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete by setting `is_active = false`. Returns `true` if the row
    /// was active before.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a failed login and, once the count reaches `max_attempts`, lock
    /// the account until `lock_until`. Returns the new count.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_until: Timestamp,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET
                 failed_login_count = failed_login_count + 1,
                 locked_until = CASE WHEN failed_login_count + 1 >= $2 THEN $3
                                     ELSE locked_until END
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    /// Reset the failed-login counter, clear any lock and stamp
    /// `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and clear any lock. Returns `true` if the
    /// user exists.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                failed_login_count = 0,
                locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
