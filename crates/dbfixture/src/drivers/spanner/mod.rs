//! Cloud Spanner driver.
//!
//! Spanner is reached through its PostgreSQL interface (PGAdapter, or the
//! emulator's PostgreSQL endpoint), so the wire handling is shared with the
//! PostgreSQL driver. What differs is the catalog (`information_schema` with
//! Spanner's `spanner_type` and `index_columns`), the lack of sequences to
//! reset and the mandatory `WHERE` on `DELETE`.
//!
//! ```text
//! postgres://localhost:5432/projects/p/instances/i/databases/d
//! ```

mod dialect;
mod reader;
mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::Client;
use tracing::info;

pub use dialect::SpannerDialect;

use super::common::{pg, TlsBuilder};
use crate::core::traits::{Database, FixtureTransaction};
use crate::error::Result;

/// A Spanner connection through the PostgreSQL interface.
pub struct SpannerDatabase {
    client: Arc<Client>,
}

impl SpannerDatabase {
    pub async fn connect(url: &str, tls: &TlsBuilder) -> Result<Self> {
        let client = pg::connect(url, tls).await?;
        info!(ssl_mode = %tls.ssl_mode(), "connected to Spanner PostgreSQL interface");
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Database for SpannerDatabase {
    type Transaction = SpannerTransaction;

    async fn begin(&mut self) -> Result<SpannerTransaction> {
        pg::execute(&self.client, "BEGIN").await?;
        Ok(SpannerTransaction {
            client: Arc::clone(&self.client),
            dialect: SpannerDialect::new(),
        })
    }

    fn name(&self) -> &str {
        "spanner"
    }
}

/// An open read/write Spanner transaction.
pub struct SpannerTransaction {
    client: Arc<Client>,
    dialect: SpannerDialect,
}

#[async_trait]
impl FixtureTransaction for SpannerTransaction {
    async fn commit(self) -> Result<()> {
        pg::execute(&self.client, "COMMIT").await
    }

    async fn rollback(self) -> Result<()> {
        pg::execute(&self.client, "ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    //! Live tests against a database that already has a `Singers` table.
    //! Set `DBFIXTURE_TEST_SPANNER_URL` and run with `--ignored`.

    use super::*;
    use crate::core::schema::JsonRow;
    use crate::core::traits::{RowClearer, RowCreator, RowLister, SchemaIntrospector};
    use crate::drivers::common::SslMode;

    #[tokio::test]
    #[ignore]
    async fn test_spanner_round_trip() {
        let url = std::env::var("DBFIXTURE_TEST_SPANNER_URL")
            .expect("DBFIXTURE_TEST_SPANNER_URL must be set");
        let mut db = SpannerDatabase::connect(&url, &TlsBuilder::new(SslMode::Disable))
            .await
            .unwrap();
        let mut tx = db.begin().await.unwrap();

        let schema = tx.get_schema("Singers").await.unwrap();
        assert!(!schema.is_empty());
        assert!(schema.has_primary_key());

        let rows: Vec<JsonRow> = vec![];
        tx.clear_rows(&schema).await.unwrap();
        assert_eq!(tx.create_rows(&schema, &rows).await.unwrap(), 0);
        assert!(tx.list_rows(&schema).await.unwrap().is_empty());
        tx.rollback().await.unwrap();
    }
}
