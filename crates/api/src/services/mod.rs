//! Long-running services held in [`AppState`](crate::state::AppState).
//!
//! - [`export`] -- launches the SAP export automation and tracks each run.
//! - [`bom_loader`] -- stores parsed CS13 exports as dated BOM revisions.

pub mod bom_loader;
pub mod export;
