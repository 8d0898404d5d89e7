//! Content hash of a BOM's component list.
//!
//! Two loads with the same components (in any order) hash to the same value,
//! so reloading an unchanged export does not create a new revision.

use sha2::{Digest, Sha256};

use super::BomComponent;

/// SHA-256 hex digest of the components, sorted by `(item_no, qty)` with the
/// component number breaking ties.
///
/// Each component contributes the JSON tuple
/// `[component_no, item_no, qty, measure, comm_code, origin]`; the digest is
/// taken over the JSON array of those tuples. An empty list hashes `[]`.
pub fn compute_bom_hash(components: &[BomComponent]) -> String {
    let mut sorted: Vec<&BomComponent> = components.iter().collect();
    sorted.sort_by(|a, b| {
        a.item_no
            .as_deref()
            .unwrap_or("")
            .cmp(b.item_no.as_deref().unwrap_or(""))
            .then(a.qty.total_cmp(&b.qty))
            .then_with(|| a.component_no.cmp(&b.component_no))
    });

    let tuples: Vec<serde_json::Value> = sorted
        .iter()
        .map(|c| {
            serde_json::json!([
                c.component_no,
                c.item_no,
                c.qty,
                c.measure,
                c.comm_code,
                c.origin,
            ])
        })
        .collect();

    let payload = serde_json::Value::Array(tuples).to_string();
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(no: &str, item: &str, qty: f64) -> BomComponent {
        BomComponent {
            component_no: no.into(),
            description: Some(format!("{no} description")),
            qty,
            measure: Some("PC".into()),
            origin: None,
            item_no: Some(item.into()),
            comm_code: Some("85444290".into()),
        }
    }

    #[test]
    fn empty_list_hashes_empty_array() {
        let expected: String = Sha256::digest(b"[]")
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_eq!(compute_bom_hash(&[]), expected);
    }

    #[test]
    fn order_does_not_matter() {
        let a = vec![component("C-1", "0010", 2.0), component("C-2", "0020", 1.0)];
        let b = vec![component("C-2", "0020", 1.0), component("C-1", "0010", 2.0)];
        assert_eq!(compute_bom_hash(&a), compute_bom_hash(&b));
    }

    #[test]
    fn quantity_change_changes_hash() {
        let a = vec![component("C-1", "0010", 2.0)];
        let b = vec![component("C-1", "0010", 2.5)];
        assert_ne!(compute_bom_hash(&a), compute_bom_hash(&b));
    }

    #[test]
    fn description_is_not_hashed() {
        let a = vec![component("C-1", "0010", 2.0)];
        let mut b = a.clone();
        b[0].description = Some("renamed".into());
        assert_eq!(compute_bom_hash(&a), compute_bom_hash(&b));
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let hash = compute_bom_hash(&[component("C-1", "0010", 1.0)]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
