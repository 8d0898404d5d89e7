//! Quantity parsing for SAP list exports.
//!
//! SAP renders numbers with the user's decimal notation, so the same export
//! can contain `1,000.000` (US) or `1.000,000` (EU).

use std::sync::LazyLock;

use regex::Regex;

/// `1,000` / `12,345,678`: comma used only as thousands separator.
static THOUSANDS_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{0,2}(,\d{3})+$").expect("valid regex"));

/// Parse a quantity written in US or EU notation.
///
/// Returns `None` for empty or unparsable input.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s: String = raw.split_whitespace().collect();
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        // Both separators: whichever comes last is the decimal point.
        (Some(comma), Some(dot)) if comma < dot => s.replace(',', ""),
        (Some(_), Some(_)) => s.replace('.', "").replace(',', "."),
        (Some(_), None) if THOUSANDS_COMMA.is_match(&s) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}
