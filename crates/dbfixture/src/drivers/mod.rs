//! Database driver implementations.
//!
//! - [`mysql`]: MySQL via `mysql_async`
//! - [`postgres`]: PostgreSQL via `tokio-postgres`
//! - [`sqlite`]: SQLite via `sqlx`
//! - [`spanner`]: Cloud Spanner through its PostgreSQL interface
//! - [`common`]: shared utilities (TLS, tokio-postgres helpers)
//!
//! # Architecture
//!
//! Each driver module provides:
//! - a `Dialect`: SQL syntax strategy for the engine
//! - a `Database`: connection handle that opens transactions
//! - a transaction type implementing `SchemaIntrospector`, `RowLister`,
//!   `RowClearer` and `RowCreator`
//!
//! [`DriverImpl`] and [`TransactionImpl`] wrap the concrete types in enums so
//! callers pick a driver at runtime with static dispatch.

pub mod common;
pub mod mysql;
pub mod postgres;
pub mod spanner;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use common::{SslMode, TlsBuilder};
pub use mysql::{MysqlDatabase, MysqlDialect, MysqlTransaction};
pub use postgres::{PostgresDatabase, PostgresDialect, PostgresTransaction};
pub use spanner::{SpannerDatabase, SpannerDialect, SpannerTransaction};
pub use sqlite::{SqliteDatabase, SqliteDialect, SqliteTransaction};

use crate::core::schema::{ColumnRow, JsonRow, Schema};
use crate::core::traits::{
    Database, FixtureTransaction, RowClearer, RowCreator, RowLister, SchemaIntrospector,
};
use crate::error::{FixtureError, Result};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Mysql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "sqlite3")]
    Sqlite,
    Spanner,
}

impl FromStr for DriverKind {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(DriverKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DriverKind::Postgres),
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            "spanner" => Ok(DriverKind::Spanner),
            other => Err(FixtureError::BadArgs(format!(
                "unknown driver '{}'; supported drivers: mysql, postgres, sqlite, spanner",
                other
            ))),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgres",
            DriverKind::Sqlite => "sqlite",
            DriverKind::Spanner => "spanner",
        };
        f.write_str(name)
    }
}

/// A connected database of any supported kind.
pub enum DriverImpl {
    Mysql(MysqlDatabase),
    Postgres(PostgresDatabase),
    Sqlite(SqliteDatabase),
    Spanner(SpannerDatabase),
}

impl DriverImpl {
    /// Connect to `url` with the driver for `kind`.
    ///
    /// SQLite ignores `ssl_mode`.
    pub async fn connect(kind: DriverKind, url: &str, ssl_mode: SslMode) -> Result<Self> {
        let tls = TlsBuilder::new(ssl_mode);
        let driver = match kind {
            DriverKind::Mysql => DriverImpl::Mysql(MysqlDatabase::connect(url, &tls).await?),
            DriverKind::Postgres => {
                DriverImpl::Postgres(PostgresDatabase::connect(url, &tls).await?)
            }
            DriverKind::Sqlite => DriverImpl::Sqlite(SqliteDatabase::connect(url).await?),
            DriverKind::Spanner => DriverImpl::Spanner(SpannerDatabase::connect(url, &tls).await?),
        };
        Ok(driver)
    }

    pub fn kind(&self) -> DriverKind {
        match self {
            DriverImpl::Mysql(_) => DriverKind::Mysql,
            DriverImpl::Postgres(_) => DriverKind::Postgres,
            DriverImpl::Sqlite(_) => DriverKind::Sqlite,
            DriverImpl::Spanner(_) => DriverKind::Spanner,
        }
    }
}

#[async_trait]
impl Database for DriverImpl {
    type Transaction = TransactionImpl;

    async fn begin(&mut self) -> Result<TransactionImpl> {
        let tx = match self {
            DriverImpl::Mysql(db) => TransactionImpl::Mysql(db.begin().await?),
            DriverImpl::Postgres(db) => TransactionImpl::Postgres(db.begin().await?),
            DriverImpl::Sqlite(db) => TransactionImpl::Sqlite(db.begin().await?),
            DriverImpl::Spanner(db) => TransactionImpl::Spanner(db.begin().await?),
        };
        Ok(tx)
    }

    fn name(&self) -> &str {
        match self {
            DriverImpl::Mysql(db) => db.name(),
            DriverImpl::Postgres(db) => db.name(),
            DriverImpl::Sqlite(db) => db.name(),
            DriverImpl::Spanner(db) => db.name(),
        }
    }
}

/// An open transaction of any supported kind.
pub enum TransactionImpl {
    Mysql(MysqlTransaction),
    Postgres(PostgresTransaction),
    Sqlite(SqliteTransaction),
    Spanner(SpannerTransaction),
}

#[async_trait]
impl SchemaIntrospector for TransactionImpl {
    async fn get_schema(&mut self, table: &str) -> Result<Schema> {
        match self {
            TransactionImpl::Mysql(tx) => tx.get_schema(table).await,
            TransactionImpl::Postgres(tx) => tx.get_schema(table).await,
            TransactionImpl::Sqlite(tx) => tx.get_schema(table).await,
            TransactionImpl::Spanner(tx) => tx.get_schema(table).await,
        }
    }
}

#[async_trait]
impl RowLister for TransactionImpl {
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>> {
        match self {
            TransactionImpl::Mysql(tx) => tx.list_rows(schema).await,
            TransactionImpl::Postgres(tx) => tx.list_rows(schema).await,
            TransactionImpl::Sqlite(tx) => tx.list_rows(schema).await,
            TransactionImpl::Spanner(tx) => tx.list_rows(schema).await,
        }
    }
}

#[async_trait]
impl RowClearer for TransactionImpl {
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()> {
        match self {
            TransactionImpl::Mysql(tx) => tx.clear_rows(schema).await,
            TransactionImpl::Postgres(tx) => tx.clear_rows(schema).await,
            TransactionImpl::Sqlite(tx) => tx.clear_rows(schema).await,
            TransactionImpl::Spanner(tx) => tx.clear_rows(schema).await,
        }
    }
}

#[async_trait]
impl RowCreator for TransactionImpl {
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64> {
        match self {
            TransactionImpl::Mysql(tx) => tx.create_rows(schema, rows).await,
            TransactionImpl::Postgres(tx) => tx.create_rows(schema, rows).await,
            TransactionImpl::Sqlite(tx) => tx.create_rows(schema, rows).await,
            TransactionImpl::Spanner(tx) => tx.create_rows(schema, rows).await,
        }
    }
}

#[async_trait]
impl FixtureTransaction for TransactionImpl {
    async fn commit(self) -> Result<()> {
        match self {
            TransactionImpl::Mysql(tx) => tx.commit().await,
            TransactionImpl::Postgres(tx) => tx.commit().await,
            TransactionImpl::Sqlite(tx) => tx.commit().await,
            TransactionImpl::Spanner(tx) => tx.commit().await,
        }
    }

    async fn rollback(self) -> Result<()> {
        match self {
            TransactionImpl::Mysql(tx) => tx.rollback().await,
            TransactionImpl::Postgres(tx) => tx.rollback().await,
            TransactionImpl::Sqlite(tx) => tx.rollback().await,
            TransactionImpl::Spanner(tx) => tx.rollback().await,
        }
    }
}
