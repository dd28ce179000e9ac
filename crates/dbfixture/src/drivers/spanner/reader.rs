//! Spanner schema introspection and row listing.

use async_trait::async_trait;
use tracing::debug;

use super::SpannerTransaction;
use crate::core::schema::{Column, ColumnRow, Schema};
use crate::core::traits::{Dialect, RowLister, SchemaIntrospector};
use crate::drivers::common::pg;
use crate::error::Result;

const COLUMNS_QUERY: &str = r#"
    SELECT column_name, spanner_type
    FROM information_schema.columns
    WHERE table_schema = 'public'
      AND table_name = $1
    ORDER BY ordinal_position
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT column_name
    FROM information_schema.index_columns
    WHERE table_schema = 'public'
      AND table_name = $1
      AND index_type = 'PRIMARY_KEY'
    ORDER BY ordinal_position
"#;

/// Foreign-key targets plus the interleave parent, if any.
const REFERENCES_QUERY: &str = r#"
    SELECT pk.table_name
    FROM information_schema.referential_constraints rc
    JOIN information_schema.table_constraints fk
      ON fk.constraint_schema = rc.constraint_schema
     AND fk.constraint_name = rc.constraint_name
    JOIN information_schema.table_constraints pk
      ON pk.constraint_schema = rc.unique_constraint_schema
     AND pk.constraint_name = rc.unique_constraint_name
    WHERE fk.table_schema = 'public'
      AND fk.table_name = $1
    UNION
    SELECT parent_table_name
    FROM information_schema.tables
    WHERE table_schema = 'public'
      AND table_name = $1
      AND parent_table_name IS NOT NULL
"#;

#[async_trait]
impl SchemaIntrospector for SpannerTransaction {
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

        debug!(table, columns = columns.len(), "introspected schema");
        Schema::from_parts(table, columns, primary_keys, references)
    }
}

#[async_trait]
impl RowLister for SpannerTransaction {
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>> {
        let sql = self.dialect.build_select_query(schema);
        pg::list_rows(&self.client, &sql, schema).await
    }
}
