//! SQLite SQL dialect.

use crate::core::schema::Schema;
use crate::core::traits::Dialect;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn max_params(&self) -> usize {
        // SQLITE_MAX_VARIABLE_NUMBER default since 3.32
        32_766
    }

    /// Insertion order. Tables without a primary key always have a rowid.
    fn fallback_order(&self, _schema: &Schema) -> Vec<String> {
        vec!["rowid".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Column;
    use crate::core::value::ColumnType;

    #[test]
    fn test_select_falls_back_to_rowid() {
        let schema = Schema::from_parts(
            "log",
            vec![Column::new("msg", "TEXT", ColumnType::String)],
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(
            SqliteDialect::new().build_select_query(&schema),
            "SELECT * FROM \"log\" ORDER BY rowid"
        );
    }

    #[test]
    fn test_numbered_placeholders() {
        let cols = vec![
            Column::new("a", "INTEGER", ColumnType::Integer),
            Column::new("b", "TEXT", ColumnType::String),
        ];
        let refs: Vec<&Column> = cols.iter().collect();
        assert_eq!(
            SqliteDialect::new().build_insert_query("t", &refs, 2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?1, ?2), (?3, ?4)"
        );
    }
}
