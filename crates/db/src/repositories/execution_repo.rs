//! Repository for the `execution_history` table.
//!
//! Every status change is guarded in SQL so a run can only move along the
//! lifecycle in `rpa_core::execution_status`; the update methods return
//! `false` when the row was not in a state that allows the move.

use rpa_core::execution_status::{
    EXECUTION_CANCELLED, EXECUTION_FAILED, EXECUTION_PENDING, EXECUTION_RUNNING,
    EXECUTION_SUCCESS,
};
use std::time::Duration;

use rpa_core::types::DbId;
use sqlx::PgPool;

use crate::models::execution::{CreateExecution, Execution, ExecutionFilter};

/// Column list including the joined status name and user email.
const COLUMNS: &str = "\
    eh.id, eh.user_id, u.email AS user_email, eh.process, \
    eh.period_start, eh.period_end, eh.file_path, eh.file_name, \
    eh.status_id, es.name AS status, \
    eh.started_at, eh.finished_at, eh.duration_secs, \
    eh.sap_system, eh.transaction_code, eh.machine, \
    eh.error_message, eh.stack_trace, eh.created_at, eh.updated_at";

const JOIN: &str = "\
    execution_history eh \
    JOIN execution_statuses es ON eh.status_id = es.id \
    JOIN users u ON eh.user_id = u.id";

/// Optional filters, each skipped when its parameter is NULL.
const FILTER: &str = "\
    ($1::BIGINT IS NULL OR eh.user_id = $1) \
    AND ($2::SMALLINT IS NULL OR eh.status_id = $2) \
    AND ($3::TEXT IS NULL OR eh.process = $3)";

/// Seconds since `started_at` (or zero if the run never started).
const ELAPSED: &str = "EXTRACT(EPOCH FROM (NOW() - COALESCE(started_at, NOW())))::DOUBLE PRECISION";

pub struct ExecutionRepo;

impl ExecutionRepo {
    /// Record a new run in `PENDING`.
    pub async fn create(pool: &PgPool, dto: &CreateExecution) -> Result<Execution, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO execution_history \
                (user_id, process, period_start, period_end, file_name, \
                 sap_system, transaction_code, machine, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(dto.user_id)
        .bind(&dto.process)
        .bind(dto.period_start)
        .bind(dto.period_end)
        .bind(&dto.file_name)
        .bind(&dto.sap_system)
        .bind(&dto.transaction_code)
        .bind(&dto.machine)
        .bind(EXECUTION_PENDING)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {JOIN} WHERE eh.id = $1");
        sqlx::query_as::<_, Execution>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// PENDING -> RUNNING, stamping `started_at`.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE execution_history \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(EXECUTION_RUNNING)
        .bind(EXECUTION_PENDING)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// RUNNING -> SUCCESS with the produced file.
    pub async fn succeed(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
        file_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE execution_history SET \
                status_id = $2, \
                file_path = $3, \
                file_name = $4, \
                finished_at = NOW(), \
                duration_secs = {ELAPSED} \
             WHERE id = $1 AND status_id = $5"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(EXECUTION_SUCCESS)
            .bind(file_path)
            .bind(file_name)
            .bind(EXECUTION_RUNNING)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// PENDING | RUNNING -> FAILED, keeping the message and captured stderr.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
        stack_trace: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE execution_history SET \
                status_id = $2, \
                error_message = $3, \
                stack_trace = $4, \
                finished_at = NOW(), \
                duration_secs = {ELAPSED} \
             WHERE id = $1 AND status_id IN ($5, $6)"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(EXECUTION_FAILED)
            .bind(error_message)
            .bind(stack_trace)
            .bind(EXECUTION_PENDING)
            .bind(EXECUTION_RUNNING)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// PENDING | RUNNING -> CANCELLED.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE execution_history SET \
                status_id = $2, \
                error_message = 'Cancelled by user', \
                finished_at = NOW(), \
                duration_secs = {ELAPSED} \
             WHERE id = $1 AND status_id IN ($3, $4)"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(EXECUTION_CANCELLED)
            .bind(EXECUTION_PENDING)
            .bind(EXECUTION_RUNNING)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List runs newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ExecutionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {JOIN} \
             WHERE {FILTER} \
             ORDER BY eh.created_at DESC, eh.id DESC \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(filter.user_id)
            .bind(filter.status_id)
            .bind(&filter.process)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, filter: &ExecutionFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {JOIN} WHERE {FILTER}");
        sqlx::query_scalar(&query)
            .bind(filter.user_id)
            .bind(filter.status_id)
            .bind(&filter.process)
            .fetch_one(pool)
            .await
    }

    /// Fail runs left PENDING or RUNNING for longer than `older_than`, e.g.
    /// by a crash. Younger rows may belong to another live process and are
    /// left alone. Returns the number of rows touched.
    pub async fn fail_stale(
        pool: &PgPool,
        reason: &str,
        older_than: Duration,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE execution_history SET \
                status_id = $1, \
                error_message = $2, \
                finished_at = NOW(), \
                duration_secs = {ELAPSED} \
             WHERE status_id IN ($3, $4) \
               AND COALESCE(started_at, created_at) < NOW() - $5 * INTERVAL '1 second'"
        );
        let result = sqlx::query(&query)
            .bind(EXECUTION_FAILED)
            .bind(reason)
            .bind(EXECUTION_PENDING)
            .bind(EXECUTION_RUNNING)
            .bind(older_than.as_secs_f64())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
