use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rpa_core::error::CoreError;
use serde_json::json;

/// Error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and renders every variant as a
/// `{ "error", "code" }` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Lookup by a natural key (e.g. a part number) found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

type Rendered = (StatusCode, &'static str, String);

fn internal() -> Rendered {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Core(CoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Core(CoreError::Unauthorized(msg)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Core(CoreError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        };

        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// `RowNotFound` is 404, `uq_*` unique violations 409, `ck_*` check
/// violations 400 and an exhausted pool 503. Anything else is logged and
/// hidden behind a 500.
fn classify_sqlx_error(err: &sqlx::Error) -> Rendered {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::PoolTimedOut => {
            tracing::error!("Database pool exhausted");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_UNAVAILABLE",
                "Database is unavailable, retry shortly".to_string(),
            )
        }
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default();
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                ),
                Some("23514") if constraint.starts_with("ck_") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    internal()
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
