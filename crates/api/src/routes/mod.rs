pub mod admin;
pub mod auth;
pub mod bom;
pub mod executions;
pub mod health;
pub mod processes;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                         register (public)
/// /auth/login                            login (public, sets cookie)
/// /auth/refresh                          refresh (public)
/// /auth/logout                           logout (requires auth)
/// /auth/me                               current user and pages
///
/// /admin/users                           list, create (admin only)
/// /admin/users/{id}                      get, update, deactivate
/// /admin/users/{id}/reset-password       reset password
///
/// /processes                             list processes (auth)
/// /processes/{process}/run               start an export (user, admin)
///
/// /executions                            list runs (own, or all for admin/auditor)
/// /executions/{id}                       run detail
/// /executions/{id}/file                  download the spreadsheet
/// /executions/{id}/cancel                cancel (owner or admin)
///
/// /bom/load                              load a CS13 export (user, admin)
/// /bom/{part_no}                         BOMs, revisions and items of a part
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/processes", processes::router())
        .nest("/executions", executions::router())
        .nest("/bom", bom::router())
}
