//! MySQL schema introspection and row listing.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use mysql_async::prelude::*;
use mysql_async::{Row, Value};
use rust_decimal::Decimal;
use tracing::debug;

use super::MysqlTransaction;
use crate::core::schema::{Column, ColumnRow, Schema};
use crate::core::traits::{Dialect, RowLister, SchemaIntrospector};
use crate::core::value::{parse_timestamp, ColumnType, ColumnValue, DriverValue};
use crate::error::{FixtureError, Result, ResultExt};

// CAST AS CHAR: MySQL 8 reports catalog strings with a binary collation.
const COLUMNS_QUERY: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR)
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE()
      AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR)
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = DATABASE()
      AND TABLE_NAME = ?
      AND CONSTRAINT_NAME = 'PRIMARY'
    ORDER BY ORDINAL_POSITION
"#;

const REFERENCES_QUERY: &str = r#"
    SELECT DISTINCT CAST(REFERENCED_TABLE_NAME AS CHAR)
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = DATABASE()
      AND TABLE_NAME = ?
      AND REFERENCED_TABLE_NAME IS NOT NULL
"#;

#[async_trait]
impl SchemaIntrospector for MysqlTransaction {
    async fn get_schema(&mut self, table: &str) -> Result<Schema> {
        let columns: Vec<(String, String)> = self
            .conn
            .exec(COLUMNS_QUERY, (table,))
            .await?;
        let columns = columns
            .into_iter()
            .map(|(name, data_type)| {
                let column_type = self.dialect.classify_type(&data_type);
                Column::new(name, data_type, column_type)
            })
            .collect::<Vec<_>>();

        let primary_keys: Vec<String> = self
            .conn
            .exec(PRIMARY_KEY_QUERY, (table,))
            .await?;

        let references: Vec<String> = self
            .conn
            .exec(REFERENCES_QUERY, (table,))
            .await?;

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
impl RowLister for MysqlTransaction {
    async fn list_rows(&mut self, schema: &Schema) -> Result<Vec<ColumnRow>> {
        let sql = self.dialect.build_select_query(schema);
        debug!(sql = %sql, "listing rows");
        // A prepared statement gets binary-protocol values: integers and
        // DATETIMEs arrive typed instead of as text.
        let rows: Vec<Row> = self
            .conn
            .exec(&sql, ())
            .await
            .context("statement", &sql)?;

        rows.iter()
            .map(|row| read_row(row, schema))
            .collect()
    }
}

fn read_row(row: &Row, schema: &Schema) -> Result<ColumnRow> {
    let mut out = ColumnRow::new();
    for col in &schema.columns {
        let idx = row
            .columns_ref()
            .iter()
            .position(|c| c.name_str() == col.name.as_str())
            .ok_or_else(|| FixtureError::bad_key(&col.name, "result row"))?;
        let value = match row.as_ref(idx) {
            Some(v) => mysql_cell(v, col).context("column", &col.name)?,
            None => DriverValue::Absent,
        };
        out.insert(col.name.clone(), ColumnValue::new(col.column_type, value));
    }
    Ok(out)
}

/// Decode a MySQL value for `column`.
fn mysql_cell(value: &Value, column: &Column) -> Result<DriverValue> {
    let cell = match value {
        Value::NULL => DriverValue::Absent,
        Value::Int(i) => DriverValue::from(*i),
        Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => DriverValue::from(i),
            Err(_) => DriverValue::from(Decimal::from(*u)),
        },
        Value::Float(f) => DriverValue::from(*f),
        Value::Double(d) => DriverValue::from(*d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let dt = NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .ok_or_else(|| {
                    FixtureError::conversion(
                        "date",
                        "timestamp",
                        format!(
                            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} is not a valid date",
                            year, month, day, hour, minute, second
                        ),
                    )
                })?;
            DriverValue::from(dt)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if *negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            );
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            DriverValue::String(Some(text))
        }
        Value::Bytes(bytes) => text_cell(bytes, column)?,
    };
    Ok(cell)
}

/// Values that arrive as text: DECIMAL, strings, and anything the server
/// chose to send in text form.
fn text_cell(bytes: &[u8], column: &Column) -> Result<DriverValue> {
    if column.column_type == ColumnType::Boolean {
        // BIT(1) arrives as a single raw byte
        return Ok(DriverValue::Bytes(Some(bytes.to_vec())));
    }
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return Ok(DriverValue::Bytes(Some(bytes.to_vec()))),
    };
    let invalid = |target: &str, e: String| {
        FixtureError::conversion("text", target, format!("'{}': {}", text, e))
    };

    let cell = match column.column_type {
        ColumnType::Integer => {
            DriverValue::from(text.parse::<i64>().map_err(|e| invalid("integer", e.to_string()))?)
        }
        ColumnType::Float => match Decimal::from_str_exact(text) {
            Ok(d) => DriverValue::from(d),
            Err(_) => DriverValue::from(
                f64::from_str(text).map_err(|e| invalid("float", e.to_string()))?,
            ),
        },
        ColumnType::Time => DriverValue::from(parse_timestamp(text)?),
        _ => DriverValue::from(text),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn column(data_type: &str, column_type: ColumnType) -> Column {
        Column::new("c", data_type, column_type)
    }

    #[test]
    fn test_decimal_text_keeps_scale() {
        let col = column("decimal(30,15)", ColumnType::Float);
        let cell = mysql_cell(&Value::Bytes(b"123.450000000000000".to_vec()), &col).unwrap();
        assert_eq!(
            cell,
            DriverValue::from(Decimal::from_str("123.450000000000000").unwrap())
        );
    }

    #[test]
    fn test_datetime_value() {
        let col = column("datetime", ColumnType::Time);
        let cell = mysql_cell(&Value::Date(2024, 1, 2, 3, 4, 5, 0), &col).unwrap();
        assert_eq!(
            cell,
            DriverValue::from(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_zero_date_is_rejected() {
        let col = column("datetime", ColumnType::Time);
        assert!(mysql_cell(&Value::Date(0, 0, 0, 0, 0, 0, 0), &col).is_err());
    }

    #[test]
    fn test_time_of_day_is_text() {
        let col = column("time", ColumnType::String);
        let cell = mysql_cell(&Value::Time(false, 1, 2, 3, 4, 500), &col).unwrap();
        assert_eq!(cell, DriverValue::from("26:03:04.000500"));
    }

    #[test]
    fn test_unsigned_overflow_becomes_decimal() {
        let col = column("bigint unsigned", ColumnType::Integer);
        let cell = mysql_cell(&Value::UInt(u64::MAX), &col).unwrap();
        assert!(matches!(cell, DriverValue::Decimal(Some(_))));
        let cell = mysql_cell(&Value::UInt(7), &col).unwrap();
        assert_eq!(cell, DriverValue::from(7i64));
    }

    #[test]
    fn test_bit_one_stays_raw() {
        let col = column("bit(1)", ColumnType::Boolean);
        let cell = mysql_cell(&Value::Bytes(vec![1]), &col).unwrap();
        let cv = ColumnValue::new(ColumnType::Boolean, cell);
        assert_eq!(cv.as_bool().unwrap(), Some(true));
    }

    #[test]
    fn test_null_is_absent() {
        let col = column("int", ColumnType::Integer);
        assert_eq!(mysql_cell(&Value::NULL, &col).unwrap(), DriverValue::Absent);
    }
}
