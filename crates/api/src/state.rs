use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::export::ExportOrchestrator;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: rpa_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Starts, tracks and cancels export runs.
    pub exports: Arc<ExportOrchestrator>,
}
