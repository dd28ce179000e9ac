//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy
//! - [`SqliteDatabase`]: single-connection pool that opens transactions
//! - [`SqliteTransaction`]: schema introspection and row operations
//!
//! # Connection String
//!
//! ```text
//! sqlite://path/to/file.db
//! sqlite::memory:
//! ```
//!
//! The pool keeps exactly one connection alive for its whole lifetime so an
//! in-memory database survives between transactions.

mod dialect;
mod reader;
mod writer;

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::info;

pub use dialect::SqliteDialect;

use crate::core::traits::{Database, FixtureTransaction};
use crate::error::Result;

/// A SQLite database.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        info!("opened SQLite database");
        Ok(Self { pool })
    }

    /// The underlying pool, for setup outside a fixture transaction.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    type Transaction = SqliteTransaction;

    async fn begin(&mut self) -> Result<SqliteTransaction> {
        Ok(SqliteTransaction {
            tx: self.pool.begin().await?,
            dialect: SqliteDialect::new(),
        })
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// An open SQLite transaction.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    dialect: SqliteDialect,
}

#[async_trait]
impl FixtureTransaction for SqliteTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, Schema};
    use crate::core::traits::RowClearer;
    use crate::core::value::ColumnType;

    #[tokio::test]
    async fn test_failed_clear_restores_foreign_key_enforcement() {
        let mut db = SqliteDatabase::connect("sqlite::memory:").await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let ghost = Schema::from_parts(
            "ghost",
            vec![Column::new("id", "INTEGER", ColumnType::Integer)],
            vec![],
            vec![],
        )
        .unwrap();

        assert!(tx.clear_rows(&ghost).await.is_err());
        let deferred: i64 = sqlx::query_scalar("PRAGMA defer_foreign_keys")
            .fetch_one(&mut *tx.tx)
            .await
            .unwrap();
        assert_eq!(deferred, 0);
        tx.rollback().await.unwrap();
    }
}
