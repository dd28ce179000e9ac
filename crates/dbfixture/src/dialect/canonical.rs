//! Vendor type name to canonical [`ColumnType`] classification.
//!
//! Classification is a case-insensitive prefix match on the type name as the
//! catalog reports it, so `varchar(255)`, `VARCHAR` and `character varying`
//! all land in the same family. Anything unrecognized is treated as text.

use crate::core::value::ColumnType;

const INTEGER_PREFIXES: &[&str] = &[
    "INT", "TINYINT", "SMALLINT", "MEDIUMINT", "BIGINT", "SERIAL", "SMALLSERIAL", "BIGSERIAL",
];

const FLOAT_PREFIXES: &[&str] = &["FLOAT", "DOUBLE", "REAL", "NUMERIC", "DECIMAL"];

// Plain TIME and INTERVAL are durations/times of day and stay text.
const TIME_PREFIXES: &[&str] = &["DATE", "TIMESTAMP"];

/// Classify a vendor type name.
pub fn classify(data_type: &str) -> ColumnType {
    let upper = data_type.trim().to_ascii_uppercase();

    if upper.starts_with("INTERVAL") {
        return ColumnType::String;
    }
    if upper.starts_with("BOOL") {
        return ColumnType::Boolean;
    }
    if has_prefix(&upper, INTEGER_PREFIXES) {
        return ColumnType::Integer;
    }
    if has_prefix(&upper, FLOAT_PREFIXES) {
        return ColumnType::Float;
    }
    if has_prefix(&upper, TIME_PREFIXES) {
        return ColumnType::Time;
    }
    ColumnType::String
}

/// MySQL spells booleans `TINYINT(1)` (or `BIT(1)`), which must win over the
/// integer rule.
pub fn classify_mysql(data_type: &str) -> ColumnType {
    let upper = data_type.trim().to_ascii_uppercase();
    if upper.starts_with("TINYINT(1)") || upper.starts_with("BIT(1)") {
        return ColumnType::Boolean;
    }
    classify(data_type)
}

fn has_prefix(upper: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| upper.starts_with(p))
}
