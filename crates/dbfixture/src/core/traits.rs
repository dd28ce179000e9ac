//! Core traits for fixture loading and dumping.
//!
//! - [`Dialect`]: SQL text strategy for a database engine
//! - [`SchemaIntrospector`]: reads a table's columns, key and references
//! - [`RowLister`], [`RowClearer`], [`RowCreator`]: the per-table row operations
//! - [`FixtureTransaction`]: all of the above inside one database transaction
//! - [`Database`]: opens a [`FixtureTransaction`]
//!
//! The orchestrator only ever talks to these traits, so every driver (and the
//! in-memory test database) plugs in the same way.

use async_trait::async_trait;

use super::schema::{Column, ColumnRow, JsonRow, Schema};
use super::value::ColumnType;
use crate::dialect::canonical;
use crate::error::Result;

/// SQL syntax strategy.
///
/// Default methods build the statements every supported engine shares; a
/// dialect overrides only what differs.
pub trait Dialect: Send + Sync {
    /// Driver name (e.g. "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Bound-parameter placeholder for the 1-based `index`.
    fn param_placeholder(&self, index: usize) -> String;

    /// Maximum bound parameters per statement.
    fn max_params(&self) -> usize;

    /// Map a vendor type name to its canonical column type.
    fn classify_type(&self, data_type: &str) -> ColumnType {
        canonical::classify(data_type)
    }

    /// ORDER BY terms used when a table has no primary key.
    fn fallback_order(&self, schema: &Schema) -> Vec<String> {
        schema
            .columns
            .iter()
            .map(|c| self.quote_ident(&c.name))
            .collect()
    }

    /// Select list for [`Dialect::build_select_query`]. Every expression must
    /// keep its column's name.
    fn select_list(&self, _schema: &Schema) -> String {
        "*".to_string()
    }

    /// Placeholder for the value of `column` at the 1-based `index`.
    fn insert_placeholder(&self, _column: &Column, index: usize) -> String {
        self.param_placeholder(index)
    }

    /// SELECT of every column in primary-key order.
    fn build_select_query(&self, schema: &Schema) -> String {
        let order = if schema.has_primary_key() {
            schema
                .primary_keys
                .iter()
                .map(|c| self.quote_ident(c))
                .collect()
        } else {
            self.fallback_order(schema)
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_list(schema),
            self.quote_ident(&schema.table)
        );
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        sql
    }

    /// Delete every row of a table.
    fn build_delete_query(&self, table: &str) -> String {
        format!("DELETE FROM {}", self.quote_ident(table))
    }

    /// Multi-row INSERT with `rows` tuples over `columns`.
    fn build_insert_query(&self, table: &str, columns: &[&Column], rows: usize) -> String {
        let col_list = columns
            .iter()
            .map(|c| self.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut index = 0;
        let tuples = (0..rows)
            .map(|_| {
                let placeholders = columns
                    .iter()
                    .map(|column| {
                        index += 1;
                        self.insert_placeholder(column, index)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", placeholders)
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote_ident(table),
            col_list,
            tuples
        )
    }
}

/// Reads table metadata from the database catalog.
#[async_trait]
pub trait SchemaIntrospector: Send {
    /// Introspect `table`. A table that does not exist yields an empty schema.
    async fn get_schema(&mut self, table: &str) -> Result<Schema>;
}

/// Reads every row of a table.
#[async_trait]
pub trait RowLister: Send {
    /// All rows in primary-key order, each cell tagged with its schema type.
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>>;
}

/// Empties a table.
#[async_trait]
pub trait RowClearer: Send {
    /// Delete all rows and reset sequence state where the engine keeps one.
    ///
    /// Foreign-key enforcement is relaxed only for the duration of the clear and
    /// restored even if the clear fails.
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()>;
}

/// Inserts fixture rows.
#[async_trait]
pub trait RowCreator: Send {
    /// Insert `rows` and return the number inserted.
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64>;
}

/// One open transaction supporting every row operation.
#[async_trait]
pub trait FixtureTransaction: SchemaIntrospector + RowLister + RowClearer + RowCreator {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A connected database.
#[async_trait]
pub trait Database: Send {
    type Transaction: FixtureTransaction;

    /// Begin a transaction. Nothing it does is visible until commit.
    async fn begin(&mut self) -> Result<Self::Transaction>;

    /// Driver name for logging.
    fn name(&self) -> &str;
}

/// Combine the outcome of a scoped operation with the outcome of restoring
/// session state afterwards. The operation's error wins.
pub fn finish_scoped<T>(result: Result<T>, restore: Result<()>) -> Result<T> {
    let value = result?;
    restore?;
    Ok(value)
}
