//! Conversion between JSON fixture cells and relational values.
//!
//! Dump direction: [`column_to_json`] / [`row_to_json`].
//! Init direction: [`json_to_param`] / [`insert_batches`].

use tracing::debug;

use super::json::{JsonValue, Number};
use super::schema::{Column, ColumnRow, JsonRow, Schema};
use super::traits::Dialect;
use super::value::{format_timestamp, parse_timestamp, ColumnType, ColumnValue, DriverValue, Param};
use crate::error::{FixtureError, Result, ResultExt};

/// Convert a database cell to JSON according to its column type.
pub fn column_to_json(value: &ColumnValue) -> Result<JsonValue> {
    let json = match value.column_type() {
        ColumnType::Boolean => value.as_bool()?.map(JsonValue::Boolean),
        ColumnType::Integer => value.as_integer()?.map(JsonValue::from),
        ColumnType::Float => float_to_json(value)?,
        ColumnType::String => value.as_string()?.map(JsonValue::String),
        ColumnType::Time => value
            .as_time()?
            .map(|t| JsonValue::String(format_timestamp(&t))),
        ColumnType::Unknown => untyped_to_json(value.value())?,
    };
    Ok(json.unwrap_or(JsonValue::Null))
}

/// Exact decimals keep their scale; binary floats use the shortest text that
/// reads back to the same f64.
fn float_to_json(value: &ColumnValue) -> Result<Option<JsonValue>> {
    match value.value() {
        DriverValue::Decimal(d) => Ok(d.map(|d| JsonValue::Number(Number::from(d)))),
        DriverValue::Int(i) => Ok(i.map(JsonValue::from)),
        _ => match value.as_float()? {
            Some(f) => Ok(Some(JsonValue::Number(Number::try_from(f)?))),
            None => Ok(None),
        },
    }
}

/// Cells without a declared type convert by what the driver produced.
fn untyped_to_json(value: &DriverValue) -> Result<Option<JsonValue>> {
    Ok(match value {
        DriverValue::Absent => None,
        DriverValue::Bool(v) => v.map(JsonValue::Boolean),
        DriverValue::Int(v) => v.map(JsonValue::from),
        DriverValue::Float(v) => match v {
            Some(f) => Some(JsonValue::Number(Number::try_from(*f)?)),
            None => None,
        },
        DriverValue::Decimal(v) => v.map(|d| JsonValue::Number(Number::from(d))),
        DriverValue::String(v) => v.clone().map(JsonValue::String),
        DriverValue::Time(v) => v.map(|t| JsonValue::String(format_timestamp(&t))),
        DriverValue::Bytes(v) => match v {
            Some(b) => Some(JsonValue::String(String::from_utf8(b.clone()).map_err(|e| {
                FixtureError::conversion("bytes", "string", e.to_string())
            })?)),
            None => None,
        },
    })
}

/// Convert a database row to a JSON row.
pub fn row_to_json(row: &ColumnRow) -> Result<JsonRow> {
    row.iter()
        .map(|(name, value)| Ok((name.clone(), column_to_json(value).context("column", name)?)))
        .collect()
}

/// Convert a fixture cell to a statement parameter for `column`.
///
/// A missing cell or JSON null becomes a NULL typed after the column.
pub fn json_to_param(value: Option<&JsonValue>, column: &Column) -> Result<Param> {
    let value = match value {
        None | Some(JsonValue::Null) => return Ok(Param::Null(column.column_type)),
        Some(v) => v,
    };
    match column.column_type {
        ColumnType::Boolean => Ok(Param::Bool(value.as_db_bool()?)),
        ColumnType::Integer => Ok(Param::Int(value.as_i64()?)),
        ColumnType::Float if column.is_exact_numeric() => Ok(Param::Decimal(value.as_decimal()?)),
        ColumnType::Float => Ok(Param::Float(value.as_f64()?)),
        ColumnType::String => Ok(Param::String(value.as_string()?)),
        ColumnType::Time => Ok(Param::Time(parse_timestamp(&value.as_string()?)?)),
        ColumnType::Unknown => Err(FixtureError::unsupported(&column.data_type)),
    }
}

/// One multi-row INSERT with its index-aligned parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub sql: String,
    pub params: Vec<Param>,
    pub rows: usize,
}

/// Build the INSERT statements that load `rows` into the schema's table.
///
/// Columns follow schema order. Rows are split so no statement exceeds the
/// dialect's bound-parameter limit. Row keys that are not columns are rejected.
pub fn insert_batches<D: Dialect + ?Sized>(
    dialect: &D,
    schema: &Schema,
    rows: &[JsonRow],
) -> Result<Vec<InsertBatch>> {
    if rows.is_empty() || schema.is_empty() {
        return Ok(Vec::new());
    }

    let columns: Vec<&Column> = schema.columns.iter().collect();
    let rows_per_batch = (dialect.max_params() / columns.len()).max(1);
    let mut batches = Vec::new();

    for (chunk_idx, chunk) in rows.chunks(rows_per_batch).enumerate() {
        let mut params = Vec::with_capacity(chunk.len() * columns.len());
        for (offset, row) in chunk.iter().enumerate() {
            let row_idx = chunk_idx * rows_per_batch + offset;
            if let Some(unknown) = row.keys().find(|k| schema.column(k).is_none()) {
                return Err(FixtureError::bad_key(unknown, format!("table {}", schema.table))
                    .with_context("row", row_idx));
            }
            for col in &columns {
                let param = json_to_param(row.get(&col.name), col)
                    .context("column", &col.name)
                    .context("row", row_idx)?;
                params.push(param);
            }
        }
        let sql = dialect.build_insert_query(&schema.table, &columns, chunk.len());
        debug!(table = %schema.table, rows = chunk.len(), "built insert batch");
        batches.push(InsertBatch {
            sql,
            params,
            rows: chunk.len(),
        });
    }

    Ok(batches)
}
