//! SQLite row clearing and insertion.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;
use tracing::debug;

use super::SqliteTransaction;
use crate::core::bridge::insert_batches;
use crate::core::schema::{JsonRow, Schema};
use crate::core::traits::{finish_scoped, Dialect, RowClearer, RowCreator};
use crate::core::value::{format_timestamp, ColumnType, Param};
use crate::error::{Result, ResultExt};

impl SqliteTransaction {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!(sql, "executing");
        let done = sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .context("statement", sql)?;
        Ok(done.rows_affected())
    }

    async fn delete_and_reset(&mut self, table: &str) -> Result<()> {
        let sql = self.dialect.build_delete_query(table);
        self.execute(&sql).await?;

        // sqlite_sequence only exists once some table uses AUTOINCREMENT
        let has_sequences: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
        )
        .fetch_one(&mut *self.tx)
        .await?;
        if has_sequences > 0 {
            sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?1")
                .bind(table)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RowClearer for SqliteTransaction {
    // Deferred violations are still checked at COMMIT.
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()> {
        self.execute("PRAGMA defer_foreign_keys = ON").await?;
        let cleared = self.delete_and_reset(&schema.table).await;
        let restored = self
            .execute("PRAGMA defer_foreign_keys = OFF")
            .await
            .map(|_| ());
        finish_scoped(cleared, restored)
    }
}

#[async_trait]
impl RowCreator for SqliteTransaction {
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64> {
        let batches = insert_batches(&self.dialect, schema, rows)?;

        let mut inserted = 0;
        for batch in &batches {
            debug!(sql = %batch.sql, rows = batch.rows, "inserting");
            let query = batch
                .params
                .iter()
                .fold(sqlx::query(&batch.sql), bind_param);
            inserted += query
                .execute(&mut *self.tx)
                .await
                .context("statement", &batch.sql)?
                .rows_affected();
        }
        Ok(inserted)
    }
}

/// Bind a parameter. Exact decimals and timestamps are stored as text.
fn bind_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &Param,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        Param::Null(ColumnType::Integer | ColumnType::Boolean) => query.bind(None::<i64>),
        Param::Null(ColumnType::Float) => query.bind(None::<f64>),
        Param::Null(_) => query.bind(None::<String>),
        Param::Bool(b) => query.bind(*b),
        Param::Int(i) => query.bind(*i),
        Param::Float(f) => query.bind(*f),
        Param::Decimal(d) => query.bind(d.to_string()),
        Param::String(s) => query.bind(s.clone()),
        Param::Time(t) => query.bind(format_timestamp(t)),
    }
}
