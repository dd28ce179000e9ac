//! Spanner row clearing and insertion.

use async_trait::async_trait;

use super::SpannerTransaction;
use crate::core::bridge::insert_batches;
use crate::core::schema::{JsonRow, Schema};
use crate::core::traits::{Dialect, RowClearer, RowCreator};
use crate::drivers::common::pg;
use crate::error::Result;

#[async_trait]
impl RowClearer for SpannerTransaction {
    // No sequences to reset and foreign keys cannot be suspended.
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()> {
        let sql = self.dialect.build_delete_query(&schema.table);
        pg::execute(&self.client, &sql).await
    }
}

#[async_trait]
impl RowCreator for SpannerTransaction {
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64> {
        let batches = insert_batches(&self.dialect, schema, rows)?;
        pg::insert(&self.client, &batches).await
    }
}
