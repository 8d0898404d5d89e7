//! Part, BOM, revision and item models.

use chrono::NaiveDate;
use rpa_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Part {
    pub id: DbId,
    pub part_no: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A BOM header, unique per (part, plant, usage, alternative).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bom {
    pub id: DbId,
    pub part_id: DbId,
    pub plant: String,
    pub usage: String,
    pub alternative: String,
    pub base_qty: Option<f64>,
    pub reqd_qty: Option<f64>,
    pub base_unit: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Key and header quantities used to find or create a [`Bom`].
#[derive(Debug, Clone)]
pub struct UpsertBom {
    pub part_id: DbId,
    pub plant: String,
    pub usage: String,
    pub alternative: String,
    pub base_qty: Option<f64>,
    pub reqd_qty: Option<f64>,
    pub base_unit: Option<String>,
}

/// A dated revision of a BOM's component list. `effective_to` is `None`
/// for the open (current) revision.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BomRevision {
    pub id: DbId,
    pub bom_id: DbId,
    pub revision_no: i32,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub hash: String,
    pub source: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateBomRevision {
    pub bom_id: DbId,
    pub revision_no: i32,
    pub effective_from: NaiveDate,
    pub hash: String,
    pub source: Option<String>,
}

/// A component line joined with its part number and description.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BomItem {
    pub id: DbId,
    pub revision_id: DbId,
    pub component_id: DbId,
    /// Joined from `parts.part_no`.
    pub component_no: String,
    /// Joined from `parts.description`.
    pub description: Option<String>,
    pub item_no: Option<String>,
    pub qty: f64,
    pub measure: Option<String>,
    pub comm_code: Option<String>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateBomItem {
    pub revision_id: DbId,
    pub component_id: DbId,
    pub item_no: Option<String>,
    pub qty: f64,
    pub measure: Option<String>,
    pub comm_code: Option<String>,
    pub origin: Option<String>,
}
