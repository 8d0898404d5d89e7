//! Query parameter types shared by handlers.

use rpa_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use rpa_core::types::DbId;
use serde::Deserialize;

/// `?limit=&offset=`, clamped via [`PaginationParams::window`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Effective `(limit, offset)`.
    pub fn window(&self) -> (i64, i64) {
        (
            clamp_limit(self.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            clamp_offset(self.offset),
        )
    }
}

/// Filters for `GET /executions`.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutionListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Status name, e.g. `FAILED` (case-insensitive).
    pub status: Option<String>,
    /// `purchasing` or `sales`.
    pub process: Option<String>,
    /// Only honoured for roles that may see every run.
    pub user_id: Option<DbId>,
}

impl ExecutionListParams {
    pub fn window(&self) -> (i64, i64) {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
        .window()
    }
}
