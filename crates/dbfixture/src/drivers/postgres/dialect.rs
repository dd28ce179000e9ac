//! PostgreSQL SQL dialect.
//!
//! String columns whose type has no binary codec in the driver (enums,
//! `interval`, `inet`, `money`, `timetz`, arrays, ...) are read as `col::text`
//! and written as `$n::text::<type>`, so the server does the conversion.

use crate::core::schema::{Column, Schema};
use crate::core::traits::Dialect;
use crate::core::value::ColumnType;
use crate::dialect::canonical;

/// String-class types decoded and bound natively, by `format_type` name
/// without modifiers.
const NATIVE_STRING_TYPES: &[&str] = &[
    "text",
    "character varying",
    "varchar",
    "character",
    "char",
    "bpchar",
    "\"char\"",
    "name",
    "citext",
    "uuid",
    "json",
    "jsonb",
    "bytea",
    "time without time zone",
];

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }

    /// Whether values of `column` travel as text.
    fn casts_through_text(column: &Column) -> bool {
        column.column_type == ColumnType::String
            && !NATIVE_STRING_TYPES.contains(&base_type(&column.data_type).as_str())
    }
}

/// `format_type` output with type modifiers removed, e.g.
/// `time(3) without time zone` becomes `time without time zone`.
fn base_type(data_type: &str) -> String {
    let mut out = String::with_capacity(data_type.len());
    let mut depth = 0usize;
    for c in data_type.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c.to_ascii_lowercase()),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Handle names that contain double quotes by doubling them
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn max_params(&self) -> usize {
        // Bind message parameter count is a u16
        65_535
    }

    fn classify_type(&self, data_type: &str) -> ColumnType {
        if data_type.trim_end().ends_with("[]") {
            return ColumnType::String;
        }
        canonical::classify(data_type)
    }

    fn select_list(&self, schema: &Schema) -> String {
        schema
            .columns
            .iter()
            .map(|c| {
                let ident = self.quote_ident(&c.name);
                if Self::casts_through_text(c) {
                    format!("{}::text AS {}", ident, ident)
                } else {
                    ident
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn insert_placeholder(&self, column: &Column, index: usize) -> String {
        if Self::casts_through_text(column) {
            format!("${}::text::{}", index, column.data_type)
        } else {
            self.param_placeholder(index)
        }
    }
}
