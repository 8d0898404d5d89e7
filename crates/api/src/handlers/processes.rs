//! Handlers for the `/processes` resource (launching report exports).

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use rpa_core::error::CoreError;
use rpa_core::period::Period;
use rpa_core::process::Process;
use rpa_core::types::DbId;
use rpa_db::models::execution::Execution;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::state::AppState;

/// Optional body of `POST /processes/{process}/run`.
///
/// Either an explicit range or a calendar month; an empty body means the
/// previous calendar month.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl RunRequest {
    /// Resolve the requested period relative to `today`.
    pub fn period(&self, today: NaiveDate) -> Result<Period, CoreError> {
        match (self.period_start, self.period_end, self.year, self.month) {
            (Some(start), Some(end), None, None) => Period::new(start, end),
            (None, None, Some(year), Some(month)) => Period::month(year, month),
            (None, None, None, None) => Period::previous_month(today),
            _ => Err(CoreError::Validation(
                "Give either period_start and period_end, or year and month".into(),
            )),
        }
    }
}

/// One entry of `GET /processes`.
#[derive(Debug, Serialize)]
pub struct ProcessInfo {
    pub process: Process,
    pub transaction: &'static str,
    /// Whether an automation script is configured for it.
    pub configured: bool,
    /// The run currently holding the process, if any.
    pub running_execution_id: Option<DbId>,
}

/// GET /api/v1/processes
pub async fn list_processes(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Json<Vec<ProcessInfo>> {
    let infos = Process::ALL
        .into_iter()
        .map(|process| ProcessInfo {
            process,
            transaction: process.default_transaction(),
            configured: state.exports.config().script_for(process).is_some(),
            running_execution_id: state.exports.active_execution(process),
        })
        .collect();
    Json(infos)
}

/// POST /api/v1/processes/{process}/run
///
/// Records a `PENDING` run and starts it in the background. Returns 202
/// with the run, or 409 if the process is already running.
pub async fn run_process(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(process): Path<String>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Execution>)> {
    let process: Process = process.parse()?;

    let request: RunRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };
    let period = request.period(Utc::now().date_naive())?;

    let execution = state.exports.start(user.user_id, process, period).await?;
    Ok((StatusCode::ACCEPTED, Json(execution)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_request_means_previous_month() {
        let period = RunRequest::default().period(date(2025, 3, 10)).unwrap();
        assert_eq!(period, Period::month(2025, 2).unwrap());
    }

    #[test]
    fn explicit_range_is_kept() {
        let request = RunRequest {
            period_start: Some(date(2025, 1, 5)),
            period_end: Some(date(2025, 1, 20)),
            ..Default::default()
        };
        let period = request.period(date(2025, 3, 10)).unwrap();
        assert_eq!((period.start, period.end), (date(2025, 1, 5), date(2025, 1, 20)));
    }

    #[test]
    fn mixed_forms_are_rejected() {
        let request = RunRequest {
            period_start: Some(date(2025, 1, 5)),
            year: Some(2025),
            ..Default::default()
        };
        assert_matches!(request.period(date(2025, 3, 10)), Err(CoreError::Validation(_)));

        let half = RunRequest {
            month: Some(4),
            ..Default::default()
        };
        assert_matches!(half.period(date(2025, 3, 10)), Err(CoreError::Validation(_)));
    }
}
