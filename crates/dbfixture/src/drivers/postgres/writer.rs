//! PostgreSQL row clearing and insertion.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::PostgresTransaction;
use crate::core::bridge::insert_batches;
use crate::core::schema::{JsonRow, Schema};
use crate::core::traits::{finish_scoped, Dialect, RowClearer, RowCreator};
use crate::drivers::common::pg;
use crate::error::{Result, ResultExt};

/// Sequences owned by the table's columns (serial and identity).
const SEQUENCES_QUERY: &str = r#"
    SELECT seq
    FROM (
        SELECT pg_get_serial_sequence(format('%I.%I', n.nspname, t.relname), a.attname) AS seq
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        WHERE n.nspname = current_schema()
          AND t.relname = $1
          AND a.attnum > 0
          AND NOT a.attisdropped
    ) s
    WHERE seq IS NOT NULL
"#;

impl PostgresTransaction {
    /// Stop foreign-key triggers from firing until [`Self::restore_foreign_keys`].
    ///
    /// Returns the previous `session_replication_role`, or `None` when the role
    /// could not be changed (it needs superuser or, from PostgreSQL 15, a
    /// `GRANT SET ON PARAMETER session_replication_role`). In that case only
    /// DEFERRABLE constraints are relaxed.
    async fn suspend_foreign_keys(&self) -> Result<Option<String>> {
        let previous: String = self
            .client
            .query_one("SELECT current_setting('session_replication_role')", &[])
            .await?
            .try_get(0)?;

        // A refused SET aborts the transaction unless it runs in a savepoint
        pg::execute(&self.client, "SAVEPOINT dbfixture_clear").await?;
        match pg::execute(&self.client, "SET LOCAL session_replication_role = replica").await {
            Ok(()) => {
                pg::execute(&self.client, "RELEASE SAVEPOINT dbfixture_clear").await?;
                Ok(Some(previous))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "cannot set session_replication_role, only DEFERRABLE foreign keys are suspended"
                );
                pg::execute(
                    &self.client,
                    "ROLLBACK TO SAVEPOINT dbfixture_clear; RELEASE SAVEPOINT dbfixture_clear",
                )
                .await?;
                pg::execute(&self.client, "SET CONSTRAINTS ALL DEFERRED").await?;
                Ok(None)
            }
        }
    }

    async fn restore_foreign_keys(&self, previous: Option<String>) -> Result<()> {
        match previous {
            Some(role) => {
                self.client
                    .query_one(
                        "SELECT set_config('session_replication_role', $1, true)",
                        &[&role],
                    )
                    .await
                    .context("session_replication_role", &role)?;
                Ok(())
            }
            None => pg::execute(&self.client, "SET CONSTRAINTS ALL IMMEDIATE").await,
        }
    }

    async fn delete_and_reset(&self, schema: &Schema) -> Result<()> {
        pg::execute(&self.client, &self.dialect.build_delete_query(&schema.table)).await?;

        let sequences = self
            .client
            .query(SEQUENCES_QUERY, &[&schema.table])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for seq in sequences {
            debug!(sequence = %seq, "resetting sequence");
            self.client
                .execute("SELECT setval($1::text::regclass, 1, false)", &[&seq])
                .await
                .context("sequence", &seq)?;
        }
        Ok(())
    }
}

#[async_trait]
impl RowClearer for PostgresTransaction {
    // ON DELETE actions are skipped too while the role is `replica`.
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()> {
        let previous = self.suspend_foreign_keys().await?;
        let cleared = self.delete_and_reset(schema).await;
        let restored = self.restore_foreign_keys(previous).await;
        finish_scoped(cleared, restored)
    }
}

#[async_trait]
impl RowCreator for PostgresTransaction {
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64> {
        let batches = insert_batches(&self.dialect, schema, rows)?;
        pg::insert(&self.client, &batches).await
    }
}
