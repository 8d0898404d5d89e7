//! Well-known role constants and role-based page access.
//!
//! Role ids must match the seed data in `20250101000001_create_users.sql`.

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
pub const ROLE_AUDITOR: &str = "auditor";

pub const ROLE_ADMIN_ID: DbId = 1;
pub const ROLE_USER_ID: DbId = 2;
pub const ROLE_AUDITOR_ID: DbId = 3;

/// Role assigned to self-registered accounts.
pub const DEFAULT_ROLE_ID: DbId = ROLE_USER_ID;

/// A page of the web front end that is gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Dashboard,
    Purchasing,
    Sales,
    Executions,
    Bom,
    Users,
}

const ADMIN_PAGES: &[Page] = &[
    Page::Dashboard,
    Page::Purchasing,
    Page::Sales,
    Page::Executions,
    Page::Bom,
    Page::Users,
];

const USER_PAGES: &[Page] = &[
    Page::Dashboard,
    Page::Purchasing,
    Page::Sales,
    Page::Executions,
    Page::Bom,
];

const AUDITOR_PAGES: &[Page] = &[Page::Dashboard, Page::Executions];

/// Pages visible to `role`. Unknown roles see nothing.
pub fn pages_for_role(role: &str) -> &'static [Page] {
    match role {
        ROLE_ADMIN => ADMIN_PAGES,
        ROLE_USER => USER_PAGES,
        ROLE_AUDITOR => AUDITOR_PAGES,
        _ => &[],
    }
}

pub fn can_access_page(role: &str, page: Page) -> bool {
    pages_for_role(role).contains(&page)
}

/// Whether `role` may trigger export runs and load BOMs.
///
/// Auditors are read-only.
pub fn can_run_exports(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_USER
}

/// Whether `role` may see every user's executions (not just its own).
pub fn can_view_all_executions(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_AUDITOR
}
