use axum::routing::{get, post};
use axum::Router;

use crate::handlers::processes;
use crate::state::AppState;

/// Routes mounted at `/processes`.
///
/// ```text
/// GET  /               -> list_processes
/// POST /{process}/run  -> run_process (user or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(processes::list_processes))
        .route("/{process}/run", post(processes::run_process))
}
