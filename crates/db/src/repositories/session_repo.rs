//! Refresh-token sessions (`user_sessions`).
//!
//! A session is live while `is_revoked = false` and `expires_at` is in the
//! future. Refresh consumes a session atomically, so a token can be rotated
//! once even under concurrent requests.

use rpa_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::{CreateSession, UserSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, \
                        user_agent, ip_address, created_at, updated_at";

const LIVE: &str = "is_revoked = false AND expires_at > NOW()";

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions
                 (user_id, refresh_token_hash, expires_at, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// The live session for a refresh-token hash, if any.
    pub async fn find_live(pool: &PgPool, hash: &str) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions WHERE refresh_token_hash = $1 AND {LIVE}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Revoke the live session for `hash` and return it. `None` when the
    /// token is unknown, expired, or was already used.
    pub async fn consume(pool: &PgPool, hash: &str) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET is_revoked = true
             WHERE refresh_token_hash = $1 AND {LIVE}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Log a user out everywhere. Returns the number of sessions revoked.
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .map(|r| r.rows_affected())
    }

    /// Delete every session that can no longer be used.
    pub async fn purge_dead(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM user_sessions WHERE NOT ({LIVE})");
        sqlx::query(&query)
            .execute(pool)
            .await
            .map(|r| r.rows_affected())
    }
}
