//! SQLite schema introspection and row listing.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column as _, Row, TypeInfo, ValueRef};
use tracing::debug;

use super::SqliteTransaction;
use crate::core::schema::{Column, ColumnRow, Schema};
use crate::core::traits::{Dialect, RowLister, SchemaIntrospector};
use crate::core::value::{parse_timestamp, ColumnType, ColumnValue, DriverValue};
use crate::error::{FixtureError, Result, ResultExt};

const COLUMNS_QUERY: &str = "SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid";

const REFERENCES_QUERY: &str = r#"SELECT DISTINCT "table" FROM pragma_foreign_key_list(?1)"#;

#[async_trait]
impl SchemaIntrospector for SqliteTransaction {
    async fn get_schema(&mut self, table: &str) -> Result<Schema> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(table)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        let mut keyed: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let name: String = row.try_get_unchecked(0)?;
            let data_type: String = row.try_get_unchecked::<Option<String>, _>(1)?.unwrap_or_default();
            // pk is the 1-based position in the primary key, 0 for other columns
            let pk: i64 = row.try_get_unchecked(2)?;
            if pk > 0 {
                keyed.push((pk, name.clone()));
            }
            let column_type = self.dialect.classify_type(&data_type);
            columns.push(Column::new(name, data_type, column_type));
        }
        keyed.sort();
        let primary_keys = keyed.into_iter().map(|(_, name)| name).collect::<Vec<_>>();

        let references = sqlx::query(REFERENCES_QUERY)
            .bind(table)
            .fetch_all(&mut *self.tx)
            .await?
            .iter()
            .map(|row| row.try_get_unchecked::<String, _>(0))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            table,
            columns = columns.len(),
            primary_keys = ?primary_keys,
            references = ?references,
            "introspected schema"
        );
        Schema::from_parts(table, columns, primary_keys, references)
    }
}

#[async_trait]
impl RowLister for SqliteTransaction {
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>> {
        let sql = self.dialect.build_select_query(schema);
        debug!(sql = %sql, "listing rows");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .context("statement", &sql)?;

        rows.iter()
            .map(|row| read_row(row, schema))
            .collect()
    }
}

fn read_row(row: &SqliteRow, schema: &Schema) -> Result<ColumnRow> {
    let mut out = ColumnRow::new();
    for col in &schema.columns {
        let idx = row
            .columns()
            .iter()
            .position(|c| c.name() == col.name)
            .ok_or_else(|| FixtureError::bad_key(&col.name, "result row"))?;
        let value = sqlite_cell(row, idx, col).context("column", &col.name)?;
        out.insert(col.name.clone(), ColumnValue::new(col.column_type, value));
    }
    Ok(out)
}

/// Decode a cell by its storage class, which in SQLite is a property of the
/// value rather than the column.
fn sqlite_cell(row: &SqliteRow, idx: usize, column: &Column) -> Result<DriverValue> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(DriverValue::Absent);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => {
            let i: i64 = row.try_get_unchecked(idx)?;
            match column.column_type {
                ColumnType::String => DriverValue::from(i.to_string()),
                ColumnType::Time => DriverValue::from(
                    DateTime::from_timestamp(i, 0).ok_or_else(|| {
                        FixtureError::conversion("integer", "timestamp", format!("{} is out of range", i))
                    })?,
                ),
                _ => DriverValue::from(i),
            }
        }
        "REAL" | "NUMERIC" => {
            let f: f64 = row.try_get_unchecked(idx)?;
            match column.column_type {
                ColumnType::String => DriverValue::from(f.to_string()),
                _ => DriverValue::from(f),
            }
        }
        "BLOB" => DriverValue::from(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => {
            let text: String = row.try_get_unchecked(idx)?;
            match column.column_type {
                ColumnType::Time => DriverValue::from(parse_timestamp(&text)?),
                _ => DriverValue::from(text),
            }
        }
    };
    Ok(value)
}
