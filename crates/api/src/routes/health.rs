use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rpa_core::process::Process;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `degraded` while the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub processes: Vec<ProcessHealth>,
}

#[derive(Serialize)]
pub struct ProcessHealth {
    pub process: Process,
    pub configured: bool,
    pub running: bool,
}

/// GET /health (unauthenticated, outside `/api/v1`)
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = rpa_db::health_check(&state.pool).await.is_ok();
    let processes = Process::ALL
        .into_iter()
        .map(|process| ProcessHealth {
            process,
            configured: state.exports.config().script_for(process).is_some(),
            running: state.exports.active_execution(process).is_some(),
        })
        .collect();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        processes,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
