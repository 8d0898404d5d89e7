//! Repository for `parts`, `boms`, `bom_revisions` and `bom_items`.
//!
//! Write methods take an open transaction: a BOM load either stores the
//! whole revision or nothing.

use chrono::NaiveDate;
use rpa_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::bom::{
    Bom, BomItem, BomRevision, CreateBomItem, CreateBomRevision, Part, UpsertBom,
};

const PART_COLUMNS: &str = "id, part_no, description, created_at, updated_at";

const BOM_COLUMNS: &str = "id, part_id, plant, usage, alternative, base_qty, reqd_qty, \
                            base_unit, created_at, updated_at";

const REVISION_COLUMNS: &str = "id, bom_id, revision_no, effective_from, effective_to, \
                                 hash, source, created_at, updated_at";

const ITEM_COLUMNS: &str = "\
    bi.id, bi.revision_id, bi.component_id, \
    p.part_no AS component_no, p.description, \
    bi.item_no, bi.qty, bi.measure, bi.comm_code, bi.origin";

pub struct BomRepo;

impl BomRepo {
    // -----------------------------------------------------------------------
    // Writes (transactional)
    // -----------------------------------------------------------------------

    /// Insert a part or refresh its description. A `None` description never
    /// overwrites a known one.
    pub async fn upsert_part(
        tx: &mut Transaction<'_, Postgres>,
        part_no: &str,
        description: Option<&str>,
    ) -> Result<Part, sqlx::Error> {
        let query = format!(
            "INSERT INTO parts (part_no, description) VALUES ($1, $2) \
             ON CONFLICT (part_no) DO UPDATE \
                SET description = COALESCE(EXCLUDED.description, parts.description) \
             RETURNING {PART_COLUMNS}"
        );
        sqlx::query_as::<_, Part>(&query)
            .bind(part_no)
            .bind(description)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find the BOM for (part, plant, usage, alternative) or create it, and
    /// refresh its header quantities.
    pub async fn upsert_bom(
        tx: &mut Transaction<'_, Postgres>,
        input: &UpsertBom,
    ) -> Result<Bom, sqlx::Error> {
        let query = format!(
            "INSERT INTO boms (part_id, plant, usage, alternative, base_qty, reqd_qty, base_unit) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT ON CONSTRAINT uq_boms_key DO UPDATE SET \
                base_qty = COALESCE(EXCLUDED.base_qty, boms.base_qty), \
                reqd_qty = COALESCE(EXCLUDED.reqd_qty, boms.reqd_qty), \
                base_unit = COALESCE(EXCLUDED.base_unit, boms.base_unit) \
             RETURNING {BOM_COLUMNS}"
        );
        sqlx::query_as::<_, Bom>(&query)
            .bind(input.part_id)
            .bind(&input.plant)
            .bind(&input.usage)
            .bind(&input.alternative)
            .bind(input.base_qty)
            .bind(input.reqd_qty)
            .bind(&input.base_unit)
            .fetch_one(&mut **tx)
            .await
    }

    /// The open revision of a BOM, locked for the rest of the transaction.
    pub async fn lock_open_revision(
        tx: &mut Transaction<'_, Postgres>,
        bom_id: DbId,
    ) -> Result<Option<BomRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {REVISION_COLUMNS} FROM bom_revisions \
             WHERE bom_id = $1 AND effective_to IS NULL \
             FOR UPDATE"
        );
        sqlx::query_as::<_, BomRevision>(&query)
            .bind(bom_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Highest revision number of a BOM, 0 if it has none.
    pub async fn max_revision_no(
        tx: &mut Transaction<'_, Postgres>,
        bom_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(MAX(revision_no), 0) FROM bom_revisions WHERE bom_id = $1")
            .bind(bom_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn close_revision(
        tx: &mut Transaction<'_, Postgres>,
        revision_id: DbId,
        effective_to: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bom_revisions SET effective_to = $2 WHERE id = $1")
            .bind(revision_id)
            .bind(effective_to)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn create_revision(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateBomRevision,
    ) -> Result<BomRevision, sqlx::Error> {
        let query = format!(
            "INSERT INTO bom_revisions (bom_id, revision_no, effective_from, hash, source) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {REVISION_COLUMNS}"
        );
        sqlx::query_as::<_, BomRevision>(&query)
            .bind(input.bom_id)
            .bind(input.revision_no)
            .bind(input.effective_from)
            .bind(&input.hash)
            .bind(&input.source)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert one component line. A second line for the same component in
    /// the same revision violates `uq_bom_items_revision_component`.
    pub async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateBomItem,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO bom_items \
                (revision_id, component_id, item_no, qty, measure, comm_code, origin) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(input.revision_id)
        .bind(input.component_id)
        .bind(&input.item_no)
        .bind(input.qty)
        .bind(&input.measure)
        .bind(&input.comm_code)
        .bind(&input.origin)
        .fetch_one(&mut **tx)
        .await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_part(pool: &PgPool, part_no: &str) -> Result<Option<Part>, sqlx::Error> {
        let query = format!("SELECT {PART_COLUMNS} FROM parts WHERE part_no = $1");
        sqlx::query_as::<_, Part>(&query)
            .bind(part_no)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_boms_for_part(pool: &PgPool, part_id: DbId) -> Result<Vec<Bom>, sqlx::Error> {
        let query = format!(
            "SELECT {BOM_COLUMNS} FROM boms WHERE part_id = $1 \
             ORDER BY plant, usage, alternative"
        );
        sqlx::query_as::<_, Bom>(&query)
            .bind(part_id)
            .fetch_all(pool)
            .await
    }

    pub async fn current_revision(
        pool: &PgPool,
        bom_id: DbId,
    ) -> Result<Option<BomRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {REVISION_COLUMNS} FROM bom_revisions \
             WHERE bom_id = $1 AND effective_to IS NULL"
        );
        sqlx::query_as::<_, BomRevision>(&query)
            .bind(bom_id)
            .fetch_optional(pool)
            .await
    }

    /// All revisions of a BOM, newest first.
    pub async fn list_revisions(
        pool: &PgPool,
        bom_id: DbId,
    ) -> Result<Vec<BomRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {REVISION_COLUMNS} FROM bom_revisions \
             WHERE bom_id = $1 ORDER BY revision_no DESC"
        );
        sqlx::query_as::<_, BomRevision>(&query)
            .bind(bom_id)
            .fetch_all(pool)
            .await
    }

    /// Component lines of a revision ordered by item number.
    pub async fn list_items(pool: &PgPool, revision_id: DbId) -> Result<Vec<BomItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM bom_items bi \
             JOIN parts p ON bi.component_id = p.id \
             WHERE bi.revision_id = $1 \
             ORDER BY bi.item_no NULLS LAST, p.part_no"
        );
        sqlx::query_as::<_, BomItem>(&query)
            .bind(revision_id)
            .fetch_all(pool)
            .await
    }
}
