//! Canonical relational value types.
//!
//! Every driver decodes its cells into a [`DriverValue`] and tags it with the
//! schema's [`ColumnType`], producing a [`ColumnValue`]. Going the other way,
//! the bridge turns JSON cells into [`Param`]s which each driver encodes for its
//! own wire protocol.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{FixtureError, Result};

/// Canonical column type, derived from the vendor type name at introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    /// Not declared. Never produced by schema introspection.
    #[default]
    Unknown,
    Boolean,
    Integer,
    Float,
    String,
    Time,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Unknown => "unknown",
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Time => "time",
        };
        f.write_str(name)
    }
}

/// A cell as handed over by a database driver.
///
/// Drivers report SQL NULL either as [`DriverValue::Absent`] or as a typed
/// variant holding `None`; both mean the same thing to [`ColumnValue`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DriverValue {
    #[default]
    Absent,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Decimal(Option<Decimal>),
    String(Option<String>),
    Time(Option<DateTime<Utc>>),
    Bytes(Option<Vec<u8>>),
}

impl DriverValue {
    /// Whether the cell is SQL NULL.
    pub fn is_null(&self) -> bool {
        match self {
            DriverValue::Absent => true,
            DriverValue::Bool(v) => v.is_none(),
            DriverValue::Int(v) => v.is_none(),
            DriverValue::Float(v) => v.is_none(),
            DriverValue::Decimal(v) => v.is_none(),
            DriverValue::String(v) => v.is_none(),
            DriverValue::Time(v) => v.is_none(),
            DriverValue::Bytes(v) => v.is_none(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DriverValue::Absent => "null",
            DriverValue::Bool(_) => "bool",
            DriverValue::Int(_) => "int",
            DriverValue::Float(_) => "float",
            DriverValue::Decimal(_) => "decimal",
            DriverValue::String(_) => "string",
            DriverValue::Time(_) => "time",
            DriverValue::Bytes(_) => "bytes",
        }
    }
}

macro_rules! driver_value_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for DriverValue {
            fn from(v: $ty) -> Self {
                DriverValue::$variant(Some(v.into()))
            }
        }

        impl From<Option<$ty>> for DriverValue {
            fn from(v: Option<$ty>) -> Self {
                DriverValue::$variant(v.map(Into::into))
            }
        }
    };
}

driver_value_from!(Bool, bool);
driver_value_from!(Int, i16);
driver_value_from!(Int, i32);
driver_value_from!(Int, i64);
driver_value_from!(Int, u32);
driver_value_from!(Float, f64);
driver_value_from!(Decimal, Decimal);
driver_value_from!(String, String);
driver_value_from!(Time, DateTime<Utc>);
driver_value_from!(Bytes, Vec<u8>);

impl From<&str> for DriverValue {
    fn from(v: &str) -> Self {
        DriverValue::String(Some(v.to_string()))
    }
}

impl From<f32> for DriverValue {
    fn from(v: f32) -> Self {
        DriverValue::Float(Some(widen_f32(v)))
    }
}

impl From<Option<f32>> for DriverValue {
    fn from(v: Option<f32>) -> Self {
        DriverValue::Float(v.map(widen_f32))
    }
}

impl From<NaiveDateTime> for DriverValue {
    fn from(v: NaiveDateTime) -> Self {
        DriverValue::Time(Some(v.and_utc()))
    }
}

impl From<Option<NaiveDateTime>> for DriverValue {
    fn from(v: Option<NaiveDateTime>) -> Self {
        DriverValue::Time(v.map(|dt| dt.and_utc()))
    }
}

impl From<NaiveDate> for DriverValue {
    fn from(v: NaiveDate) -> Self {
        DriverValue::from(Some(v))
    }
}

impl From<Option<NaiveDate>> for DriverValue {
    fn from(v: Option<NaiveDate>) -> Self {
        DriverValue::Time(v.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
    }
}

/// Widen an f32 through its shortest decimal form, so `0.1f32` reads back as
/// `0.1` rather than `0.10000000149011612`.
fn widen_f32(v: f32) -> f64 {
    v.to_string().parse::<f64>().unwrap_or(f64::from(v))
}

/// A driver cell paired with the column's canonical type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    column_type: ColumnType,
    value: DriverValue,
}

impl ColumnValue {
    pub fn new(column_type: ColumnType, value: impl Into<DriverValue>) -> Self {
        Self {
            column_type,
            value: value.into(),
        }
    }

    /// A NULL cell of the given type.
    pub fn null(column_type: ColumnType) -> Self {
        Self::new(column_type, DriverValue::Absent)
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn value(&self) -> &DriverValue {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Text content. Byte cells are accepted when they hold UTF-8.
    pub fn as_string(&self) -> Result<Option<String>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::String(v) => Ok(v.clone()),
            DriverValue::Bytes(Some(b)) => String::from_utf8(b.clone())
                .map(Some)
                .map_err(|e| FixtureError::conversion("bytes", "string", e.to_string())),
            DriverValue::Bytes(None) => Ok(None),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn as_integer(&self) -> Result<Option<i64>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Int(v) => Ok(*v),
            _ => Err(self.mismatch("integer")),
        }
    }

    /// Floating-point content. Exact decimals and integers widen to f64.
    pub fn as_float(&self) -> Result<Option<f64>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Float(v) => Ok(*v),
            DriverValue::Int(v) => Ok(v.map(|i| i as f64)),
            DriverValue::Decimal(None) => Ok(None),
            DriverValue::Decimal(Some(d)) => d.to_f64().map(Some).ok_or_else(|| {
                FixtureError::conversion("decimal", "float", format!("{} is out of range", d))
            }),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Exact decimal content, when the driver produced one.
    pub fn as_decimal(&self) -> Result<Option<Decimal>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Decimal(v) => Ok(*v),
            DriverValue::Int(v) => Ok(v.map(Decimal::from)),
            _ => Err(self.mismatch("decimal")),
        }
    }

    /// Boolean content. Integer cells are read as zero/nonzero, which is how
    /// MySQL reports `TINYINT(1)`. A single byte is a raw `BIT(1)` value or its
    /// text form `'0'`/`'1'`.
    pub fn as_bool(&self) -> Result<Option<bool>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Bool(v) => Ok(*v),
            DriverValue::Int(v) => Ok(v.map(|i| i != 0)),
            DriverValue::Bytes(Some(b)) => match b.as_slice() {
                [0] | [b'0'] => Ok(Some(false)),
                [1] | [b'1'] => Ok(Some(true)),
                _ => Err(self.mismatch("boolean")),
            },
            _ => Err(self.mismatch("boolean")),
        }
    }

    pub fn as_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Bytes(v) => Ok(v.clone()),
            DriverValue::String(v) => Ok(v.clone().map(String::into_bytes)),
            _ => Err(self.mismatch("bytes")),
        }
    }

    pub fn as_time(&self) -> Result<Option<DateTime<Utc>>> {
        match &self.value {
            DriverValue::Absent => Ok(None),
            DriverValue::Time(v) => Ok(*v),
            _ => Err(self.mismatch("time")),
        }
    }

    fn mismatch(&self, target: &str) -> FixtureError {
        FixtureError::conversion(
            self.value.kind(),
            target,
            format!("{} column holds a {} value", self.column_type, self.value.kind()),
        )
    }
}

/// A bound statement parameter.
///
/// `Null` carries the column's type so drivers with strict parameter typing
/// can emit a typed NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null(ColumnType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Time(DateTime<Utc>),
}

impl Param {
    pub fn is_null(&self) -> bool {
        matches!(self, Param::Null(_))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Null(_) => f.write_str("NULL"),
            Param::Bool(v) => write!(f, "{}", v),
            Param::Int(v) => write!(f, "{}", v),
            Param::Float(v) => write!(f, "{}", v),
            Param::Decimal(v) => write!(f, "{}", v),
            Param::String(v) => write!(f, "'{}'", v),
            Param::Time(v) => f.write_str(&format_timestamp(v)),
        }
    }
}

// ===== Timestamps =====

/// Render a timestamp as RFC 3339 in UTC with the shortest fractional part.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse fixture timestamp text.
///
/// Accepts RFC 3339 with any offset, `YYYY-MM-DD HH:MM:SS[.f]` (or with a `T`
/// separator and no offset) read as UTC, and a bare `YYYY-MM-DD` as midnight UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(FixtureError::conversion(
        "string",
        "timestamp",
        format!("'{}' is not an RFC 3339 timestamp", text),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_null_encodings_normalize() {
        let absent = ColumnValue::null(ColumnType::Integer);
        let wrapped = ColumnValue::new(ColumnType::Integer, None::<i64>);
        assert_eq!(absent.as_integer().unwrap(), None);
        assert_eq!(wrapped.as_integer().unwrap(), None);
        assert!(absent.is_null());
        assert!(wrapped.is_null());

        let bare = ColumnValue::new(ColumnType::Integer, 7i64);
        let some = ColumnValue::new(ColumnType::Integer, Some(7i32));
        assert_eq!(bare.as_integer().unwrap(), Some(7));
        assert_eq!(some.as_integer().unwrap(), Some(7));
    }

    #[test]
    fn test_null_never_mismatches() {
        let cv = ColumnValue::null(ColumnType::String);
        assert_eq!(cv.as_bool().unwrap(), None);
        assert_eq!(cv.as_time().unwrap(), None);
        assert_eq!(cv.as_bytes().unwrap(), None);
        assert_eq!(cv.as_float().unwrap(), None);
    }

    #[test]
    fn test_integer_from_string_is_mismatch() {
        let cv = ColumnValue::new(ColumnType::Integer, "12");
        let err = cv.as_integer().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadConversion);
    }

    #[test]
    fn test_bool_accepts_tinyint() {
        let cv = ColumnValue::new(ColumnType::Boolean, 1i64);
        assert_eq!(cv.as_bool().unwrap(), Some(true));
        let cv = ColumnValue::new(ColumnType::Boolean, 0i64);
        assert_eq!(cv.as_bool().unwrap(), Some(false));
        let cv = ColumnValue::new(ColumnType::Boolean, vec![1u8]);
        assert_eq!(cv.as_bool().unwrap(), Some(true));
    }

    #[test]
    fn test_bool_reads_bit_bytes_and_their_text_form() {
        let read = |bytes: &[u8]| ColumnValue::new(ColumnType::Boolean, bytes.to_vec()).as_bool();
        assert_eq!(read(&[0]).unwrap(), Some(false));
        assert_eq!(read(b"0").unwrap(), Some(false));
        assert_eq!(read(b"1").unwrap(), Some(true));
        assert!(read(&[7]).is_err());
        assert!(read(b"10").is_err());
    }

    #[test]
    fn test_float_widens_decimal_and_f32() {
        let cv = ColumnValue::new(ColumnType::Float, Decimal::new(-12345, 2));
        assert_eq!(cv.as_float().unwrap(), Some(-123.45));
        let cv = ColumnValue::new(ColumnType::Float, 0.1f32);
        assert_eq!(cv.as_float().unwrap(), Some(0.1));
    }

    #[test]
    fn test_string_from_utf8_bytes() {
        let cv = ColumnValue::new(ColumnType::String, b"hello".to_vec());
        assert_eq!(cv.as_string().unwrap().as_deref(), Some("hello"));
        let cv = ColumnValue::new(ColumnType::String, vec![0xff, 0xfe]);
        assert!(cv.as_string().is_err());
    }

    #[test]
    fn test_naive_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let cv = ColumnValue::new(ColumnType::Time, date);
        assert_eq!(
            cv.as_time().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-02T03:04:05Z");
        let dt = dt + chrono::Duration::milliseconds(123);
        assert_eq!(format_timestamp(&dt), "2024-01-02T03:04:05.123Z");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-02 03:04:05").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-02T03:04:05").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-01-02").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-01").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
