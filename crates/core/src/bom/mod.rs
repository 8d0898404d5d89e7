//! Bills of materials exported from SAP (transaction CS13).
//!
//! - [`number`] -- locale-tolerant quantity parsing.
//! - [`parser`] -- the CS13 text export format.
//! - [`hash`] -- content hash used to detect revision changes.

pub mod hash;
pub mod number;
pub mod parser;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Plant used when the export header does not name one.
pub const DEFAULT_PLANT: &str = "US10";
/// BOM usage used when the export header does not name one.
pub const DEFAULT_USAGE: &str = "1";
/// Alternative used when the export header does not name one.
pub const DEFAULT_ALTERNATIVE: &str = "01";
/// Base unit used when the export header does not name one.
pub const DEFAULT_BASE_UNIT: &str = "M";

/// One component line of a BOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    pub component_no: String,
    pub description: Option<String>,
    pub qty: f64,
    pub measure: Option<String>,
    pub origin: Option<String>,
    pub item_no: Option<String>,
    pub comm_code: Option<String>,
}

/// A complete BOM: the parent part, its plant/usage/alternative key and
/// its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomDocument {
    pub part_no: String,
    pub parent_description: Option<String>,
    pub plant: String,
    pub usage: String,
    pub alternative: String,
    pub base_qty: Option<f64>,
    pub reqd_qty: Option<f64>,
    pub base_unit: Option<String>,
    #[serde(default)]
    pub components: Vec<BomComponent>,
}

impl BomDocument {
    /// Check the invariants a BOM must satisfy before it is stored.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.part_no.trim().is_empty() {
            return Err(CoreError::Validation("BOM part number is required".into()));
        }
        for key in [&self.plant, &self.usage, &self.alternative] {
            if key.trim().is_empty() {
                return Err(CoreError::Validation(
                    "BOM plant, usage and alternative are required".into(),
                ));
            }
        }
        for c in &self.components {
            if c.component_no.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Every component needs a part number".into(),
                ));
            }
            if !c.qty.is_finite() || c.qty < 0.0 {
                return Err(CoreError::Validation(format!(
                    "Component {} has an invalid quantity {}",
                    c.component_no, c.qty
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(components: Vec<BomComponent>) -> BomDocument {
        BomDocument {
            part_no: "FG-100".into(),
            parent_description: None,
            plant: DEFAULT_PLANT.into(),
            usage: DEFAULT_USAGE.into(),
            alternative: DEFAULT_ALTERNATIVE.into(),
            base_qty: None,
            reqd_qty: None,
            base_unit: None,
            components,
        }
    }

    fn component(no: &str, qty: f64) -> BomComponent {
        BomComponent {
            component_no: no.into(),
            description: None,
            qty,
            measure: None,
            origin: None,
            item_no: None,
            comm_code: None,
        }
    }

    #[test]
    fn negative_quantity_rejected() {
        assert!(doc(vec![component("C-1", -1.0)]).validate().is_err());
        assert!(doc(vec![component("C-1", 0.0)]).validate().is_ok());
    }

    #[test]
    fn blank_keys_rejected() {
        let mut d = doc(vec![]);
        d.plant = " ".into();
        assert!(d.validate().is_err());
        let mut d = doc(vec![]);
        d.part_no.clear();
        assert!(d.validate().is_err());
    }
}
