//! Helpers shared by drivers speaking the PostgreSQL wire protocol.
//!
//! Both the PostgreSQL driver and the Spanner driver (through its PostgreSQL
//! interface) run on a single `tokio_postgres::Client` with an explicit
//! `BEGIN`/`COMMIT`. Cells decode by the column's wire type and parameters encode
//! by the type the server inferred when preparing the statement. Types without
//! a codec here reach these helpers as text (see the PostgreSQL dialect).

use std::future::Future;

use chrono::{NaiveTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::instrument::WithSubscriber;
use tracing::{debug, warn};

use super::tls::TlsBuilder;
use crate::core::bridge::InsertBatch;
use crate::core::schema::{ColumnRow, Schema};
use crate::core::value::{format_timestamp, ColumnValue, DriverValue, Param};
use crate::error::{FixtureError, Result, ResultExt};

type PgParam = Box<dyn ToSql + Sync + Send>;

/// Open a client, spawning its connection task on the current runtime.
pub async fn connect(url: &str, tls: &TlsBuilder) -> Result<Client> {
    let client = match tls.postgres_connector()? {
        Some(connector) => {
            let (client, connection) = tokio_postgres::connect(url, connector).await?;
            spawn_connection(connection);
            client
        }
        None => {
            let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
            spawn_connection(connection);
            client
        }
    };
    Ok(client)
}

fn spawn_connection<F>(connection: F)
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(
        async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "connection closed with error");
            }
        }
        .with_current_subscriber(),
    );
}

/// Run a statement without parameters.
pub async fn execute(client: &Client, sql: &str) -> Result<()> {
    debug!(sql, "executing");
    client.batch_execute(sql).await.context("statement", sql)
}

/// Run a SELECT and tag every schema column of every row.
pub async fn list_rows(client: &Client, sql: &str, schema: &Schema) -> Result<Vec<ColumnRow>> {
    debug!(sql, "listing rows");
    let rows = client.query(sql, &[]).await.context("statement", sql)?;

    rows.iter()
        .map(|row| -> Result<ColumnRow> {
            let mut out = ColumnRow::new();
            for col in &schema.columns {
                let idx = row
                    .columns()
                    .iter()
                    .position(|c| c.name() == col.name)
                    .ok_or_else(|| FixtureError::bad_key(&col.name, format!("result of {}", sql)))?;
                let value = pg_cell(row, idx).context("column", &col.name)?;
                out.insert(col.name.clone(), ColumnValue::new(col.column_type, value));
            }
            Ok(out)
        })
        .collect()
}

/// Prepare and run each INSERT batch, binding parameters by inferred type.
pub async fn insert(client: &Client, batches: &[InsertBatch]) -> Result<u64> {
    let mut inserted = 0;
    for batch in batches {
        debug!(sql = %batch.sql, rows = batch.rows, "inserting");
        let statement = client
            .prepare(&batch.sql)
            .await
            .context("statement", &batch.sql)?;

        let params = batch
            .params
            .iter()
            .zip(statement.params())
            .map(|(param, ty)| to_pg_param(param, ty))
            .collect::<Result<Vec<_>>>()
            .context("statement", &batch.sql)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        inserted += client
            .execute(&statement, &refs)
            .await
            .context("statement", &batch.sql)?;
    }
    Ok(inserted)
}

/// Decode one cell by its wire type.
pub fn pg_cell(row: &Row, idx: usize) -> Result<DriverValue> {
    let ty = row.columns()[idx].type_();
    let value = match ty.name() {
        "bool" => row.try_get::<_, Option<bool>>(idx)?.into(),
        "int2" => row.try_get::<_, Option<i16>>(idx)?.into(),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.into(),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.into(),
        "oid" => row.try_get::<_, Option<u32>>(idx)?.into(),
        "float4" => row.try_get::<_, Option<f32>>(idx)?.into(),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.into(),
        "numeric" => row.try_get::<_, Option<Decimal>>(idx)?.into(),
        "timestamp" => row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?.into(),
        "timestamptz" => row.try_get::<_, Option<chrono::DateTime<Utc>>>(idx)?.into(),
        "date" => row.try_get::<_, Option<chrono::NaiveDate>>(idx)?.into(),
        "time" => DriverValue::String(
            row.try_get::<_, Option<NaiveTime>>(idx)?
                .map(|t| t.to_string()),
        ),
        "uuid" => DriverValue::String(
            row.try_get::<_, Option<uuid::Uuid>>(idx)?
                .map(|u| u.to_string()),
        ),
        "json" | "jsonb" => DriverValue::String(
            row.try_get::<_, Option<serde_json::Value>>(idx)?
                .map(|v| v.to_string()),
        ),
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        _ if <String as tokio_postgres::types::FromSql>::accepts(ty) => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        other => return Err(FixtureError::unsupported(other)),
    };
    Ok(value)
}

/// Encode a parameter for the server-inferred type `ty`.
pub fn to_pg_param(param: &Param, ty: &Type) -> Result<PgParam> {
    let name = ty.name();
    let mismatch = || {
        FixtureError::conversion(
            param_kind(param),
            name,
            format!("cannot bind {} to a {} parameter", param, name),
        )
    };

    let boxed: PgParam = match param {
        Param::Null(_) => typed_null(ty),
        Param::Bool(b) => match name {
            "bool" => Box::new(*b),
            "int2" => Box::new(i16::from(*b)),
            "int4" => Box::new(i32::from(*b)),
            "int8" => Box::new(i64::from(*b)),
            _ if is_text(ty) => Box::new(b.to_string()),
            _ => return Err(mismatch()),
        },
        Param::Int(i) => match name {
            "int2" => Box::new(i16::try_from(*i).map_err(|_| mismatch())?),
            "int4" => Box::new(i32::try_from(*i).map_err(|_| mismatch())?),
            "int8" => Box::new(*i),
            "oid" => Box::new(u32::try_from(*i).map_err(|_| mismatch())?),
            "float4" => Box::new(*i as f32),
            "float8" => Box::new(*i as f64),
            "numeric" => Box::new(Decimal::from(*i)),
            "bool" => Box::new(*i != 0),
            _ if is_text(ty) => Box::new(i.to_string()),
            _ => return Err(mismatch()),
        },
        Param::Float(f) => match name {
            "float4" => Box::new(*f as f32),
            "float8" => Box::new(*f),
            "numeric" => Box::new(Decimal::from_f64(*f).ok_or_else(mismatch)?),
            "int2" | "int4" | "int8" if f.fract() == 0.0 => {
                return to_pg_param(&Param::Int(*f as i64), ty)
            }
            _ if is_text(ty) => Box::new(f.to_string()),
            _ => return Err(mismatch()),
        },
        Param::Decimal(d) => match name {
            "numeric" => Box::new(*d),
            "float8" => Box::new(d.to_f64().ok_or_else(mismatch)?),
            "float4" => Box::new(d.to_f32().ok_or_else(mismatch)?),
            "int2" | "int4" | "int8" if d.fract().is_zero() => {
                return to_pg_param(&Param::Int(d.to_i64().ok_or_else(mismatch)?), ty)
            }
            _ if is_text(ty) => Box::new(d.to_string()),
            _ => return Err(mismatch()),
        },
        Param::String(s) => match name {
            "uuid" => Box::new(uuid::Uuid::parse_str(s).map_err(|e| {
                FixtureError::conversion("string", "uuid", e.to_string())
            })?),
            "json" | "jsonb" => Box::new(
                serde_json::from_str::<serde_json::Value>(s)
                    .map_err(|e| FixtureError::conversion("string", name, format!("'{}': {}", s, e)))?,
            ),
            "time" => Box::new(NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|e| {
                FixtureError::conversion("string", "time", format!("'{}': {}", s, e))
            })?),
            "bytea" => Box::new(s.clone().into_bytes()),
            _ if is_text(ty) => Box::new(s.clone()),
            _ => return Err(mismatch()),
        },
        Param::Time(t) => match name {
            "timestamptz" => Box::new(*t),
            "timestamp" => Box::new(t.naive_utc()),
            "date" => Box::new(t.date_naive()),
            _ if is_text(ty) => Box::new(format_timestamp(t)),
            _ => return Err(mismatch()),
        },
    };
    Ok(boxed)
}

fn typed_null(ty: &Type) -> PgParam {
    match ty.name() {
        "bool" => Box::new(None::<bool>),
        "int2" => Box::new(None::<i16>),
        "int4" => Box::new(None::<i32>),
        "int8" => Box::new(None::<i64>),
        "oid" => Box::new(None::<u32>),
        "float4" => Box::new(None::<f32>),
        "float8" => Box::new(None::<f64>),
        "numeric" => Box::new(None::<Decimal>),
        "timestamp" => Box::new(None::<chrono::NaiveDateTime>),
        "timestamptz" => Box::new(None::<chrono::DateTime<Utc>>),
        "date" => Box::new(None::<chrono::NaiveDate>),
        "time" => Box::new(None::<NaiveTime>),
        "uuid" => Box::new(None::<uuid::Uuid>),
        "json" | "jsonb" => Box::new(None::<serde_json::Value>),
        "bytea" => Box::new(None::<Vec<u8>>),
        _ => Box::new(None::<String>),
    }
}

fn is_text(ty: &Type) -> bool {
    <String as ToSql>::accepts(ty)
}

fn param_kind(param: &Param) -> &'static str {
    match param {
        Param::Null(_) => "null",
        Param::Bool(_) => "boolean",
        Param::Int(_) => "integer",
        Param::Float(_) => "float",
        Param::Decimal(_) => "decimal",
        Param::String(_) => "string",
        Param::Time(_) => "time",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ColumnType;
    use chrono::TimeZone;

    #[test]
    fn test_null_accepts_inferred_type() {
        for ty in [Type::INT4, Type::NUMERIC, Type::TIMESTAMPTZ, Type::TEXT, Type::BOOL] {
            let p = to_pg_param(&Param::Null(ColumnType::Integer), &ty).unwrap();
            assert!(format!("{:?}", p).contains("None"));
        }
    }

    #[test]
    fn test_int_narrowing_checks_range() {
        assert!(to_pg_param(&Param::Int(40_000), &Type::INT2).is_err());
        assert!(to_pg_param(&Param::Int(40_000), &Type::INT4).is_ok());
    }

    #[test]
    fn test_string_into_uuid_and_json() {
        let uuid = Param::String("67e55044-10b1-426f-9247-bb680e5fe0c8".into());
        assert!(to_pg_param(&uuid, &Type::UUID).is_ok());
        let bad = Param::String("not-a-uuid".into());
        assert!(to_pg_param(&bad, &Type::UUID).is_err());
        let json = Param::String(r#"{"k":[1,2]}"#.into());
        assert!(to_pg_param(&json, &Type::JSONB).is_ok());
    }

    #[test]
    fn test_malformed_json_text_is_a_bad_conversion() {
        let err = to_pg_param(&Param::String("{not json".into()), &Type::JSONB).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadConversion);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_string_without_codec_is_a_bad_conversion() {
        let err = to_pg_param(&Param::String("1 day".into()), &Type::INTERVAL).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadConversion);
        assert!(to_pg_param(&Param::String("1 day".into()), &Type::TEXT).is_ok());
    }

    #[test]
    fn test_time_binds_to_timestamp_kinds() {
        let t = Param::Time(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        for ty in [Type::TIMESTAMPTZ, Type::TIMESTAMP, Type::DATE, Type::TEXT] {
            assert!(to_pg_param(&t, &ty).is_ok(), "{}", ty);
        }
        assert!(to_pg_param(&t, &Type::INT4).is_err());
    }

    #[test]
    fn test_bool_into_integer_column() {
        assert!(to_pg_param(&Param::Bool(true), &Type::INT2).is_ok());
        let err = to_pg_param(&Param::Bool(true), &Type::FLOAT8).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadConversion);
    }

    #[test]
    fn test_integral_float_into_integer_column() {
        assert!(to_pg_param(&Param::Float(3.0), &Type::INT8).is_ok());
        assert!(to_pg_param(&Param::Float(3.5), &Type::INT8).is_err());
    }
}
