use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bom;
use crate::state::AppState;

/// Routes mounted at `/bom`.
///
/// ```text
/// POST /load       -> load (user or admin)
/// GET  /{part_no}  -> get_part_boms
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/load", post(bom::load))
        .route("/{part_no}", get(bom::get_part_boms))
}
