//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresDatabase`]: a connected client that opens transactions
//! - [`PostgresTransaction`]: schema introspection and row operations
//!
//! Catalog lookups are scoped to `current_schema()`, so unqualified table names
//! resolve the same way they do in the connection's `search_path`.

mod dialect;
mod reader;
mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::Client;
use tracing::info;

pub use dialect::PostgresDialect;

use super::common::{pg, TlsBuilder};
use crate::core::traits::{Database, FixtureTransaction};
use crate::error::Result;

/// A PostgreSQL connection.
pub struct PostgresDatabase {
    client: Arc<Client>,
}

impl PostgresDatabase {
    /// Connect with a `postgres://` URL or key/value connection string.
    pub async fn connect(url: &str, tls: &TlsBuilder) -> Result<Self> {
        let client = pg::connect(url, tls).await?;
        info!(ssl_mode = %tls.ssl_mode(), "connected to PostgreSQL");
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    type Transaction = PostgresTransaction;

    async fn begin(&mut self) -> Result<PostgresTransaction> {
        pg::execute(&self.client, "BEGIN").await?;
        Ok(PostgresTransaction {
            client: Arc::clone(&self.client),
            dialect: PostgresDialect::new(),
        })
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

/// An open PostgreSQL transaction.
pub struct PostgresTransaction {
    client: Arc<Client>,
    dialect: PostgresDialect,
}

#[async_trait]
impl FixtureTransaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        pg::execute(&self.client, "COMMIT").await
    }

    async fn rollback(self) -> Result<()> {
        pg::execute(&self.client, "ROLLBACK").await
    }
}
