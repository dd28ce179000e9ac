//! Spanner SQL dialect, PostgreSQL interface.

use crate::core::traits::Dialect;

/// Spanner (PostgreSQL interface) dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SpannerDialect;

impl SpannerDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SpannerDialect {
    fn name(&self) -> &str {
        "spanner"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn max_params(&self) -> usize {
        950
    }

    // Spanner rejects a DELETE without a WHERE clause
    fn build_delete_query(&self, table: &str) -> String {
        format!("DELETE FROM {} WHERE true", self.quote_ident(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Column;
    use crate::core::value::ColumnType;
    use crate::dialect::classify;

    #[test]
    fn test_delete_has_where_clause() {
        assert_eq!(
            SpannerDialect::new().build_delete_query("Singers"),
            "DELETE FROM \"Singers\" WHERE true"
        );
    }

    #[test]
    fn test_insert_respects_mutation_limit() {
        let d = SpannerDialect::new();
        let cols = vec![Column::new("id", "bigint", ColumnType::Integer)];
        let refs: Vec<&Column> = cols.iter().collect();
        let sql = d.build_insert_query("t", &refs, d.max_params());
        assert!(sql.ends_with("($950)"));
    }

    #[test]
    fn test_spanner_type_names() {
        for (t, expected) in [
            ("bigint", ColumnType::Integer),
            ("INT64", ColumnType::Integer),
            ("double precision", ColumnType::Float),
            ("FLOAT64", ColumnType::Float),
            ("numeric", ColumnType::Float),
            ("boolean", ColumnType::Boolean),
            ("BOOL", ColumnType::Boolean),
            ("character varying(256)", ColumnType::String),
            ("STRING(MAX)", ColumnType::String),
            ("timestamp with time zone", ColumnType::Time),
            ("TIMESTAMP", ColumnType::Time),
            ("date", ColumnType::Time),
            ("bytea", ColumnType::String),
        ] {
            assert_eq!(classify(t), expected, "{}", t);
        }
    }
}
