//! Handlers for the `/executions` resource (export run history).
//!
//! Users see their own runs; admins and auditors see every run. A run the
//! caller may not see is reported as not found.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use rpa_core::error::CoreError;
use rpa_core::execution_status::{status_id_from_name, EXECUTION_SUCCESS};
use rpa_core::process::Process;
use rpa_core::roles::{can_view_all_executions, ROLE_ADMIN};
use rpa_core::types::DbId;
use rpa_db::models::execution::{Execution, ExecutionFilter};
use rpa_db::repositories::ExecutionRepo;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::ExecutionListParams;
use crate::response::PageResponse;
use crate::state::AppState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// GET /api/v1/executions?status=&process=&user_id=&limit=&offset=
///
/// Newest first.
pub async fn list_executions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ExecutionListParams>,
) -> AppResult<Json<PageResponse<Execution>>> {
    let status_id = match params.status.as_deref() {
        Some(name) => Some(status_id_from_name(name).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unknown execution status: '{name}'"
            )))
        })?),
        None => None,
    };
    let process = params
        .process
        .as_deref()
        .map(str::parse::<Process>)
        .transpose()?;

    let user_id = if can_view_all_executions(&auth_user.role) {
        params.user_id
    } else {
        Some(auth_user.user_id)
    };

    let filter = ExecutionFilter {
        user_id,
        status_id,
        process: process.map(|p| p.as_str().to_string()),
    };
    let (limit, offset) = params.window();

    let data = ExecutionRepo::list(&state.pool, &filter, limit, offset).await?;
    let total = ExecutionRepo::count(&state.pool, &filter).await?;

    Ok(Json(PageResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/executions/{id}
pub async fn get_execution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Execution>> {
    let execution = find_visible(&state, &auth_user, id).await?;
    Ok(Json(execution))
}

/// GET /api/v1/executions/{id}/file
///
/// Streams the spreadsheet a successful run produced.
pub async fn download_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let execution = find_visible(&state, &auth_user, id).await?;

    let file_path = match (&execution.file_path, execution.status_id) {
        (Some(path), EXECUTION_SUCCESS) => path.clone(),
        _ => {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Execution {id} has no output file (status {})",
                execution.status
            ))))
        }
    };

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(execution_id = id, path = %file_path, "Output file is gone");
            return Err(AppError::Core(CoreError::NotFound {
                entity: "ExportFile",
                id,
            }));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let file_name = execution
        .file_name
        .clone()
        .unwrap_or_else(|| format!("execution_{id}.xlsx"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// POST /api/v1/executions/{id}/cancel
///
/// Admins may cancel any run, users only their own. Returns the updated
/// row, or 409 if the run already finished.
pub async fn cancel_execution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Execution>> {
    let execution = find_visible(&state, &auth_user, id).await?;

    if auth_user.role != ROLE_ADMIN && execution.user_id != auth_user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner or an admin can cancel this execution".into(),
        )));
    }

    if !state.exports.cancel(id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Execution {id} has already finished ({})",
            execution.status
        ))));
    }

    let updated = ExecutionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Execution",
            id,
        }))?;
    Ok(Json(updated))
}

/// Load an execution the caller is allowed to see.
async fn find_visible(state: &AppState, auth_user: &AuthUser, id: DbId) -> AppResult<Execution> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Execution",
            id,
        })
    };

    let execution = ExecutionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    if !can_view_all_executions(&auth_user.role) && execution.user_id != auth_user.user_id {
        return Err(not_found());
    }
    Ok(execution)
}
