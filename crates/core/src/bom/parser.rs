//! Parser for the SAP CS13 ("Explode BOM") text export.
//!
//! Expected layout:
//!
//! ```text
//! line 3-7   Material / Plant/Usage/Alt. / Description / Base Qty / Reqd Qty
//! line 8-12  |...|Object ID|Object description|Quantity|Un|...|Comm. code|Component|
//! below      one `|`-delimited row per component, `---` separator rows
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::number::parse_quantity;
use super::{
    BomComponent, BomDocument, DEFAULT_ALTERNATIVE, DEFAULT_BASE_UNIT, DEFAULT_PLANT,
    DEFAULT_USAGE,
};

/// Exports shorter than this cannot hold a header and a table.
const MIN_LINES: usize = 10;

/// Zero-based line range holding the fixed header fields.
const HEADER_LINES: std::ops::Range<usize> = 2..7;

/// Zero-based line range searched for the table header row.
const TABLE_HEADER_LINES: std::ops::Range<usize> = 7..12;

static MATERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Material\s+(.+)").expect("valid regex"));
static PLANT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Plant/Usage/Alt\.?\s*").expect("valid regex"));
static PLANT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9]+)\s*/\s*([A-Za-z0-9]+)\s*/\s*([A-Za-z0-9]+)").expect("valid regex")
});
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Description\s+(.+)").expect("valid regex"));
static BASE_QTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Base Qty\s*\(([^)]*)\)\s*(.+)").expect("valid regex"));
static REQD_QTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Reqd Qty\s*\(([^)]*)\)\s*(.+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    ObjectId,
    ObjectDescription,
    Item,
    Unit,
    Quantity,
    CommCode,
}

/// Parse the contents of a CS13 `.txt` export.
///
/// Returns `None` when the text is too short or names no material. A valid
/// header without a recognizable component table yields a BOM with no
/// components.
pub fn parse_sap_bom_txt(content: &str) -> Option<BomDocument> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < MIN_LINES {
        return None;
    }

    let mut doc = BomDocument {
        part_no: String::new(),
        parent_description: None,
        plant: DEFAULT_PLANT.to_string(),
        usage: DEFAULT_USAGE.to_string(),
        alternative: DEFAULT_ALTERNATIVE.to_string(),
        base_qty: None,
        reqd_qty: None,
        base_unit: Some(DEFAULT_BASE_UNIT.to_string()),
        components: Vec::new(),
    };

    for line in &lines[HEADER_LINES] {
        parse_header_line(line, &mut doc);
    }

    if doc.part_no.is_empty() {
        return None;
    }

    let table = TABLE_HEADER_LINES
        .filter(|idx| *idx < lines.len())
        .find_map(|idx| {
            let line = lines[idx];
            if !(line.contains('|') && line.contains("Object") && line.contains("Component")) {
                return None;
            }
            let columns = map_columns(line);
            columns
                .contains_key(&Column::ObjectId)
                .then_some((idx, columns))
        });

    let Some((header_idx, columns)) = table else {
        return Some(doc);
    };

    doc.components = lines[header_idx + 1..]
        .iter()
        .filter_map(|line| parse_row(line, &columns))
        .collect();

    Some(doc)
}

fn parse_header_line(line: &str, doc: &mut BomDocument) {
    if line.starts_with("Material") {
        if let Some(c) = MATERIAL_RE.captures(line) {
            doc.part_no = c[1].trim().to_string();
        }
    } else if line.starts_with("Plant/Usage/Alt") {
        let payload = match line.split_once(':') {
            Some((_, rest)) => rest.trim(),
            None => line,
        };
        let payload = PLANT_PREFIX_RE.replace(payload, "");
        if let Some(c) = PLANT_KEY_RE.captures(payload.trim()) {
            doc.plant = c[1].to_string();
            doc.usage = c[2].to_string();
            doc.alternative = c[3].to_string();
        }
    } else if line.starts_with("Description") {
        if let Some(c) = DESCRIPTION_RE.captures(line) {
            let text = c[1].trim();
            doc.parent_description = (!text.is_empty()).then(|| text.to_string());
        }
    } else if line.contains("Base Qty") {
        match BASE_QTY_RE.captures(line) {
            Some(c) => {
                let unit = c[1].trim();
                doc.base_unit = Some(if unit.is_empty() {
                    DEFAULT_BASE_UNIT.to_string()
                } else {
                    unit.to_string()
                });
                doc.base_qty = parse_quantity(&c[2]);
            }
            None => doc.base_qty = last_number(line),
        }
    } else if line.contains("Reqd Qty") {
        doc.reqd_qty = match REQD_QTY_RE.captures(line) {
            Some(c) => parse_quantity(&c[2]),
            None => last_number(line),
        };
    }
}

/// Last whitespace-separated token of `line` that parses as a quantity.
fn last_number(line: &str) -> Option<f64> {
    line.split_whitespace().rev().find_map(parse_quantity)
}

fn normalize_column(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Map table columns by header name. For repeated `Un` and quantity
/// columns the first one wins.
fn map_columns(header: &str) -> HashMap<Column, usize> {
    let mut columns = HashMap::new();
    for (i, part) in header.split('|').enumerate() {
        let key = normalize_column(part);
        let column = match key.as_str() {
            "object id" | "component number" => Column::ObjectId,
            "object description" => Column::ObjectDescription,
            "item" => Column::Item,
            "un" => Column::Unit,
            "comm. code" | "comm code" => Column::CommCode,
            k if k == "quantity" || k.starts_with("qty") => Column::Quantity,
            _ => continue,
        };
        columns.entry(column).or_insert(i);
    }
    columns
}

fn parse_row(line: &str, columns: &HashMap<Column, usize>) -> Option<BomComponent> {
    if line.trim().is_empty() || !line.starts_with('|') || line.contains("---") {
        return None;
    }
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();

    let object_idx = columns[&Column::ObjectId];
    let qty_idx = columns.get(&Column::Quantity).copied().unwrap_or(0);
    if parts.len() <= object_idx.max(qty_idx) {
        return None;
    }

    let cell = |column: Column| -> Option<String> {
        columns
            .get(&column)
            .and_then(|idx| parts.get(*idx))
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    };

    let component_no = cell(Column::ObjectId)?;
    let qty = cell(Column::Quantity)
        .and_then(|raw| parse_quantity(&raw))
        .unwrap_or(0.0);

    Some(BomComponent {
        component_no,
        description: cell(Column::ObjectDescription),
        qty,
        measure: cell(Column::Unit),
        origin: None,
        item_no: cell(Column::Item),
        comm_code: cell(Column::CommCode),
    })
}
