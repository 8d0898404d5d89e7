//! Execution status ids and lifecycle rules for `execution_history`.
//!
//! Ids must match the seed data in
//! `20250101000003_create_execution_history.sql`.

use crate::types::LookupId;

/// Execution has been recorded but the automation has not started.
pub const EXECUTION_PENDING: LookupId = 1;

/// The automation script is running.
pub const EXECUTION_RUNNING: LookupId = 2;

/// The export file was produced.
pub const EXECUTION_SUCCESS: LookupId = 3;

/// The script failed, timed out, or the export file never appeared.
pub const EXECUTION_FAILED: LookupId = 4;

/// A user cancelled the run.
pub const EXECUTION_CANCELLED: LookupId = 5;

const STATUS_NAMES: [(LookupId, &str); 5] = [
    (EXECUTION_PENDING, "PENDING"),
    (EXECUTION_RUNNING, "RUNNING"),
    (EXECUTION_SUCCESS, "SUCCESS"),
    (EXECUTION_FAILED, "FAILED"),
    (EXECUTION_CANCELLED, "CANCELLED"),
];

/// Resolve a status name (case-insensitive) to its id.
pub fn status_id_from_name(name: &str) -> Option<LookupId> {
    STATUS_NAMES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(id, _)| *id)
}

pub fn status_name(id: LookupId) -> Option<&'static str> {
    STATUS_NAMES
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, n)| *n)
}

/// Terminal statuses never change again.
pub fn is_terminal(id: LookupId) -> bool {
    matches!(
        id,
        EXECUTION_SUCCESS | EXECUTION_FAILED | EXECUTION_CANCELLED
    )
}

/// Whether a run may move from `from` to `to`.
///
/// ```text
/// PENDING -> RUNNING | FAILED | CANCELLED
/// RUNNING -> SUCCESS | FAILED | CANCELLED
/// ```
pub fn can_transition(from: LookupId, to: LookupId) -> bool {
    match from {
        EXECUTION_PENDING => matches!(
            to,
            EXECUTION_RUNNING | EXECUTION_FAILED | EXECUTION_CANCELLED
        ),
        EXECUTION_RUNNING => matches!(
            to,
            EXECUTION_SUCCESS | EXECUTION_FAILED | EXECUTION_CANCELLED
        ),
        _ => false,
    }
}
