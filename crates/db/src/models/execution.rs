//! Export execution history models.

use chrono::NaiveDate;
use rpa_core::types::{DbId, LookupId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `execution_history` with the joined status name and the
/// email of the user who triggered it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Execution {
    pub id: DbId,
    pub user_id: DbId,
    /// Joined from `users.email`.
    pub user_email: String,
    pub process: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub status_id: LookupId,
    /// Joined from `execution_statuses.name`.
    pub status: String,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub duration_secs: Option<f64>,
    pub sap_system: Option<String>,
    pub transaction_code: Option<String>,
    pub machine: Option<String>,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a new run in `PENDING`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExecution {
    pub user_id: DbId,
    pub process: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_name: Option<String>,
    pub sap_system: Option<String>,
    pub transaction_code: Option<String>,
    pub machine: Option<String>,
}

/// Optional filters for listing executions. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub user_id: Option<DbId>,
    pub status_id: Option<LookupId>,
    pub process: Option<String>,
}
