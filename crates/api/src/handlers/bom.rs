//! Handlers for the `/bom` resource.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use rpa_core::bom::parser::parse_sap_bom_txt;
use rpa_db::models::bom::{Bom, BomItem, BomRevision, Part};
use rpa_db::repositories::BomRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::services::bom_loader::{load_bom, BomLoadReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoadParams {
    /// Recorded on the revision, usually the uploaded file name.
    pub source: Option<String>,
}

/// A part with every BOM it heads.
#[derive(Debug, Serialize)]
pub struct PartBoms {
    pub part: Part,
    pub boms: Vec<BomDetail>,
}

#[derive(Debug, Serialize)]
pub struct BomDetail {
    pub bom: Bom,
    /// The open revision, if any.
    pub current_revision: Option<BomRevision>,
    /// Components of the open revision.
    pub items: Vec<BomItem>,
    /// Every revision, newest first.
    pub revisions: Vec<BomRevision>,
}

/// POST /api/v1/bom/load?source=
///
/// Body is the raw CS13 text export. Invalid UTF-8 is replaced, not rejected.
pub async fn load(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Query(params): Query<LoadParams>,
    body: Bytes,
) -> AppResult<Json<DataResponse<BomLoadReport>>> {
    let text = String::from_utf8_lossy(&body);
    let doc = parse_sap_bom_txt(&text).ok_or_else(|| {
        AppError::BadRequest("Not a recognizable CS13 BOM export".into())
    })?;

    let source = params
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let report = load_bom(&state.pool, &doc, source, Utc::now().date_naive()).await?;
    tracing::info!(
        user_id = user.user_id,
        part_no = %report.part_no,
        status = ?report.status,
        "BOM loaded",
    );

    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/bom/{part_no}
pub async fn get_part_boms(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(part_no): Path<String>,
) -> AppResult<Json<DataResponse<PartBoms>>> {
    let part = BomRepo::find_part(&state.pool, part_no.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Part {part_no} not found")))?;

    let mut boms = Vec::new();
    for bom in BomRepo::list_boms_for_part(&state.pool, part.id).await? {
        let revisions = BomRepo::list_revisions(&state.pool, bom.id).await?;
        let current_revision = revisions.iter().find(|r| r.effective_to.is_none()).cloned();
        let items = match &current_revision {
            Some(rev) => BomRepo::list_items(&state.pool, rev.id).await?,
            None => Vec::new(),
        };
        boms.push(BomDetail {
            bom,
            current_revision,
            items,
            revisions,
        });
    }

    Ok(Json(DataResponse {
        data: PartBoms { part, boms },
    }))
}
