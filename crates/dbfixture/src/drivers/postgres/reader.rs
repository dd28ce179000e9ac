//! PostgreSQL schema introspection and row listing.

use async_trait::async_trait;
use tracing::debug;

use super::PostgresTransaction;
use crate::core::schema::{Column, ColumnRow, Schema};
use crate::core::traits::{Dialect, RowLister, SchemaIntrospector};
use crate::drivers::common::pg;
use crate::error::Result;

const COLUMNS_QUERY: &str = r#"
    SELECT a.attname, format_type(a.atttypid, a.atttypmod)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    WHERE n.nspname = current_schema()
      AND t.relname = $1
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT a.attname
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
    WHERE n.nspname = current_schema()
      AND t.relname = $1
      AND c.contype = 'p'
      AND a.attnum = ANY(c.conkey)
    ORDER BY array_position(c.conkey, a.attnum)
"#;

const REFERENCES_QUERY: &str = r#"
    SELECT DISTINCT rt.relname
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
    WHERE n.nspname = current_schema()
      AND t.relname = $1
      AND c.contype = 'f'
"#;

#[async_trait]
impl SchemaIntrospector for PostgresTransaction {
    async fn get_schema(&mut self, table: &str) -> Result<Schema> {
        let columns = self
            .client
            .query(COLUMNS_QUERY, &[&table])
            .await?
            .iter()
            .map(|row| -> Result<Column> {
                let name: String = row.try_get(0)?;
                let data_type: String = row.try_get(1)?;
                let column_type = self.dialect.classify_type(&data_type);
                Ok(Column::new(name, data_type, column_type))
            })
            .collect::<Result<Vec<_>>>()?;

        let primary_keys = self
            .client
            .query(PRIMARY_KEY_QUERY, &[&table])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let references = self
            .client
            .query(REFERENCES_QUERY, &[&table])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            table,
            columns = columns.len(),
            primary_keys = ?primary_keys,
            references = ?references,
            "introspected schema"
        );
        Schema::from_parts(table, columns, primary_keys, references)
    }
}

#[async_trait]
impl RowLister for PostgresTransaction {
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>> {
        let sql = self.dialect.build_select_query(schema);
        pg::list_rows(&self.client, &sql, schema).await
    }
}
