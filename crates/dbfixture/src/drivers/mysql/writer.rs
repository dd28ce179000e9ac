//! MySQL row clearing and insertion.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::Value;
use tracing::debug;

use super::MysqlTransaction;
use crate::core::bridge::insert_batches;
use crate::core::schema::{JsonRow, Schema};
use crate::core::traits::{finish_scoped, Dialect, RowClearer, RowCreator};
use crate::core::value::Param;
use crate::error::{FixtureError, Result, ResultExt};

#[async_trait]
impl RowClearer for MysqlTransaction {
    // AUTO_INCREMENT is left alone: ALTER TABLE would commit the open
    // transaction implicitly.
    async fn clear_rows(&mut self, schema: &Schema) -> Result<()> {
        let sql = self.dialect.build_delete_query(&schema.table);
        debug!(sql = %sql, "clearing");

        self.conn.query_drop("SET FOREIGN_KEY_CHECKS = 0").await?;
        let cleared = self
            .conn
            .query_drop(&sql)
            .await
            .map_err(FixtureError::from);
        let restored = self
            .conn
            .query_drop("SET FOREIGN_KEY_CHECKS = 1")
            .await
            .map_err(FixtureError::from);
        finish_scoped(cleared, restored).context("statement", &sql)
    }
}

#[async_trait]
impl RowCreator for MysqlTransaction {
    async fn create_rows(&mut self, schema: &Schema, rows: &[JsonRow]) -> Result<u64> {
        let batches = insert_batches(&self.dialect, schema, rows)?;

        let mut inserted = 0;
        for batch in batches {
            debug!(sql = %batch.sql, rows = batch.rows, "inserting");
            let params = batch
                .params
                .iter()
                .map(param_to_mysql)
                .collect::<Result<Vec<_>>>()?;
            self.conn
                .exec_drop(&batch.sql, params)
                .await
                .context("statement", &batch.sql)?;
            inserted += self.conn.affected_rows();
        }
        Ok(inserted)
    }
}

/// Convert a parameter to a MySQL value.
fn param_to_mysql(param: &Param) -> Result<Value> {
    let value = match param {
        Param::Null(_) => Value::NULL,
        Param::Bool(b) => Value::Int(i64::from(*b)),
        Param::Int(i) => Value::Int(*i),
        Param::Float(f) => Value::Double(*f),
        // Decimal text keeps the exact scale
        Param::Decimal(d) => Value::Bytes(d.to_string().into_bytes()),
        Param::String(s) => Value::Bytes(s.clone().into_bytes()),
        Param::Time(t) => {
            let naive = t.naive_utc();
            let year = u16::try_from(naive.year()).map_err(|_| {
                FixtureError::conversion("time", "datetime", format!("year {} out of range", naive.year()))
            })?;
            Value::Date(
                year,
                naive.month() as u8,
                naive.day() as u8,
                naive.hour() as u8,
                naive.minute() as u8,
                naive.second() as u8,
                naive.nanosecond() / 1_000,
            )
        }
    };
    Ok(value)
}
