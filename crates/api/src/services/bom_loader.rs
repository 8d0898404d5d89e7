//! Stores parsed CS13 exports as dated BOM revisions.
//!
//! A load that does not change the component list (same content hash as the
//! open revision) only refreshes the header. Any change closes the open
//! revision and opens the next one. The whole load is one transaction.

use chrono::{Duration, NaiveDate};
use rpa_core::bom::hash::compute_bom_hash;
use rpa_core::bom::BomDocument;
use rpa_db::models::bom::{BomRevision, CreateBomItem, CreateBomRevision, UpsertBom};
use rpa_db::repositories::BomRepo;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// A new revision was opened.
    Created,
    /// The component list matches the open revision.
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct BomLoadReport {
    pub part_no: String,
    pub plant: String,
    pub usage: String,
    pub alternative: String,
    pub status: LoadStatus,
    pub revision_no: i32,
    pub components: usize,
    pub hash: String,
}

/// End date for the revision being replaced: `today`, or the day after it
/// took effect when it was opened today (or later).
pub fn closing_date(open: &BomRevision, today: NaiveDate) -> NaiveDate {
    if today > open.effective_from {
        today
    } else {
        open.effective_from + Duration::days(1)
    }
}

/// Store `doc`, opening a new revision if its components changed.
///
/// `source` is recorded on the revision (usually the uploaded file name).
pub async fn load_bom(
    pool: &PgPool,
    doc: &BomDocument,
    source: Option<&str>,
    today: NaiveDate,
) -> AppResult<BomLoadReport> {
    doc.validate()?;

    let hash = compute_bom_hash(&doc.components);
    let mut tx = pool.begin().await?;

    let parent =
        BomRepo::upsert_part(&mut tx, &doc.part_no, doc.parent_description.as_deref()).await?;
    let bom = BomRepo::upsert_bom(
        &mut tx,
        &UpsertBom {
            part_id: parent.id,
            plant: doc.plant.clone(),
            usage: doc.usage.clone(),
            alternative: doc.alternative.clone(),
            base_qty: doc.base_qty,
            reqd_qty: doc.reqd_qty,
            base_unit: doc.base_unit.clone(),
        },
    )
    .await?;

    let report = |status, revision_no| BomLoadReport {
        part_no: doc.part_no.clone(),
        plant: doc.plant.clone(),
        usage: doc.usage.clone(),
        alternative: doc.alternative.clone(),
        status,
        revision_no,
        components: doc.components.len(),
        hash: hash.clone(),
    };

    // The next revision starts the day the open one ends, so windows never
    // overlap even for several loads on one day.
    let mut effective_from = today;
    if let Some(open) = BomRepo::lock_open_revision(&mut tx, bom.id).await? {
        if open.hash == hash {
            tx.commit().await?;
            tracing::info!(part_no = %doc.part_no, revision = open.revision_no, "BOM unchanged");
            return Ok(report(LoadStatus::Unchanged, open.revision_no));
        }
        effective_from = closing_date(&open, today);
        BomRepo::close_revision(&mut tx, open.id, effective_from).await?;
    }

    let revision_no = BomRepo::max_revision_no(&mut tx, bom.id).await? + 1;
    let revision = BomRepo::create_revision(
        &mut tx,
        &CreateBomRevision {
            bom_id: bom.id,
            revision_no,
            effective_from,
            hash: hash.clone(),
            source: source.map(str::to_string),
        },
    )
    .await?;

    for component in &doc.components {
        let part = BomRepo::upsert_part(
            &mut tx,
            &component.component_no,
            component.description.as_deref(),
        )
        .await?;
        BomRepo::insert_item(
            &mut tx,
            &CreateBomItem {
                revision_id: revision.id,
                component_id: part.id,
                item_no: component.item_no.clone(),
                qty: component.qty,
                measure: component.measure.clone(),
                comm_code: component.comm_code.clone(),
                origin: component.origin.clone(),
            },
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        part_no = %doc.part_no,
        revision = revision_no,
        components = doc.components.len(),
        "BOM revision created",
    );

    Ok(report(LoadStatus::Created, revision_no))
}
