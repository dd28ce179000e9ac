//! Canonical JSON value model.
//!
//! [`JsonValue`] is the single currency between fixture documents and database
//! rows. Numbers keep the exact decimal text they were decoded from (serde_json is
//! built with `arbitrary_precision`), so `123.450000000000000` stays
//! `123.450000000000000` through a dump/init cycle.
//!
//! The coercion accessors (`as_string`, `as_bool`, `as_i64`, `as_f64`,
//! `as_decimal`) implement the fixed cross-type matrix used when writing into a
//! database column.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FixtureError, Result};

/// A JSON number stored as validated decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Parse decimal text. Accepts the JSON number grammar only.
    pub fn parse(text: &str) -> Result<Self> {
        if is_json_number(text) {
            Ok(Number(text.to_string()))
        } else {
            Err(FixtureError::conversion(
                "text",
                "number",
                format!("'{}' is not a decimal number", text),
            ))
        }
    }

    /// The decimal text exactly as decoded.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the text denotes an integer, allowing a trailing `.0…0`.
    pub fn is_integral(&self) -> bool {
        integral_digits(&self.0).is_some()
    }

    /// Whether the value is numerically zero.
    pub fn is_zero(&self) -> bool {
        let mantissa = self
            .0
            .split(['e', 'E'])
            .next()
            .unwrap_or_default();
        mantissa
            .chars()
            .filter(|c| c.is_ascii_digit())
            .all(|c| c == '0')
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number(v.to_string())
    }
}

impl From<Decimal> for Number {
    fn from(v: Decimal) -> Self {
        Number(v.to_string())
    }
}

impl TryFrom<f64> for Number {
    type Error = FixtureError;

    fn try_from(v: f64) -> Result<Self> {
        if !v.is_finite() {
            return Err(FixtureError::conversion(
                "float",
                "number",
                format!("{} has no JSON representation", v),
            ));
        }
        // Display for f64 is the shortest text that round-trips and never uses
        // an exponent, so it is always valid JSON.
        Ok(Number(v.to_string()))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip an optional sign and a trailing `.0…0`; returns the integer text if the
/// number is integral and has no exponent.
fn integral_digits(text: &str) -> Option<&str> {
    if text.contains(['e', 'E']) {
        return None;
    }
    match text.split_once('.') {
        None => Some(text),
        Some((int, frac)) if frac.chars().all(|c| c == '0') => Some(int),
        Some(_) => None,
    }
}

fn is_json_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_len = i - int_start;
    if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
        return false;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

/// Type tag of a [`JsonValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Null => "null",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Dynamically typed, lossless JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    String(String),
    Number(Number),
    Boolean(bool),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// Convert a decoded `serde_json::Value` tree, keeping number text verbatim.
    pub fn from_native(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Boolean(b),
            serde_json::Value::Number(n) => JsonValue::Number(Number(n.to_string())),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from_native).collect())
            }
            serde_json::Value::Object(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from_native(v)))
                    .collect(),
            ),
        }
    }

    /// Exact inverse of [`JsonValue::from_native`].
    pub fn to_native(&self) -> serde_json::Value {
        match self {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Boolean(b) => serde_json::Value::Bool(*b),
            JsonValue::Number(n) => match serde_json::Number::from_str(n.as_str()) {
                Ok(num) => serde_json::Value::Number(num),
                // Number text is validated on construction.
                Err(_) => serde_json::Value::String(n.as_str().to_string()),
            },
            JsonValue::String(s) => serde_json::Value::String(s.clone()),
            JsonValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(JsonValue::to_native).collect())
            }
            JsonValue::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_native())).collect(),
            ),
        }
    }

    /// Parse JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let native: serde_json::Value = serde_json::from_str(text)?;
        Ok(JsonValue::from_native(native))
    }

    /// Build a Number from decimal text.
    pub fn number(text: &str) -> Result<Self> {
        Ok(JsonValue::Number(Number::parse(text)?))
    }

    pub fn json_type(&self) -> JsonType {
        match self {
            JsonValue::Null => JsonType::Null,
            JsonValue::String(_) => JsonType::String,
            JsonValue::Number(_) => JsonType::Number,
            JsonValue::Boolean(_) => JsonType::Boolean,
            JsonValue::Array(_) => JsonType::Array,
            JsonValue::Object(_) => JsonType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    // ===== Variant accessors (no coercion) =====

    pub fn as_array(&self) -> Result<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_object(&self) -> Result<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(map) => Ok(map),
            other => Err(other.mismatch("object")),
        }
    }

    pub fn as_number(&self) -> Result<&Number> {
        match self {
            JsonValue::Number(n) => Ok(n),
            other => Err(other.mismatch("number")),
        }
    }

    // ===== Coercions =====

    /// Coerce to text. Null yields empty text; nullability is decided by the caller.
    pub fn as_string(&self) -> Result<String> {
        match self {
            JsonValue::Null => Ok(String::new()),
            JsonValue::String(s) => Ok(s.clone()),
            JsonValue::Number(n) => Ok(n.as_str().to_string()),
            JsonValue::Boolean(b) => Ok(b.to_string()),
            other => Err(other.mismatch("string")),
        }
    }

    /// Coerce to bool. Strings must be `true`/`false` in any case.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            JsonValue::String(s) => parse_bool(s, false)
                .ok_or_else(|| self.invalid("boolean", format!("'{}' is not true or false", s))),
            _ => self.as_bool_lenient(),
        }
    }

    /// Coerce to bool for a database parameter: also accepts `"1"` and `"0"`.
    pub fn as_db_bool(&self) -> Result<bool> {
        match self {
            JsonValue::String(s) => parse_bool(s, true).ok_or_else(|| {
                self.invalid("boolean", format!("'{}' is not true, false, 1 or 0", s))
            }),
            _ => self.as_bool_lenient(),
        }
    }

    fn as_bool_lenient(&self) -> Result<bool> {
        match self {
            JsonValue::Null => Ok(false),
            JsonValue::Boolean(b) => Ok(*b),
            JsonValue::Number(n) => Ok(!n.is_zero()),
            other => Err(other.mismatch("boolean")),
        }
    }

    /// Coerce to i64. Numbers must be integral; fractional text is an error.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            JsonValue::Null => Ok(0),
            JsonValue::Boolean(b) => Ok(i64::from(*b)),
            JsonValue::Number(n) => {
                let digits = integral_digits(n.as_str()).ok_or_else(|| {
                    self.invalid("integer", format!("{} is not an integer", n))
                })?;
                digits
                    .parse::<i64>()
                    .map_err(|e| self.invalid("integer", format!("{}: {}", n, e)))
            }
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| self.invalid("integer", format!("'{}': {}", s, e))),
            other => Err(other.mismatch("integer")),
        }
    }

    /// Coerce to f64.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            JsonValue::Null => Ok(0.0),
            JsonValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsonValue::Number(n) => n
                .as_str()
                .parse::<f64>()
                .map_err(|e| self.invalid("float", format!("{}: {}", n, e))),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| self.invalid("float", format!("'{}': {}", s, e))),
            other => Err(other.mismatch("float")),
        }
    }

    /// Coerce to an exact decimal, for NUMERIC/DECIMAL columns.
    pub fn as_decimal(&self) -> Result<Decimal> {
        let text = match self {
            JsonValue::Null => return Ok(Decimal::ZERO),
            JsonValue::Boolean(b) => return Ok(Decimal::from(i64::from(*b))),
            JsonValue::Number(n) => n.as_str().to_string(),
            JsonValue::String(s) => s.trim().to_string(),
            other => return Err(other.mismatch("decimal")),
        };
        let parsed = if text.contains(['e', 'E']) {
            Decimal::from_scientific(&text)
        } else {
            Decimal::from_str_exact(&text)
        };
        parsed.map_err(|e| self.invalid("decimal", format!("'{}': {}", text, e)))
    }

    fn mismatch(&self, target: &str) -> FixtureError {
        FixtureError::conversion(
            self.json_type().to_string(),
            target,
            "no coercion between these types",
        )
    }

    fn invalid(&self, target: &str, message: String) -> FixtureError {
        FixtureError::conversion(self.json_type().to_string(), target, message)
    }
}

fn parse_bool(text: &str, allow_digits: bool) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else if allow_digits && text == "1" {
        Some(true)
    } else if allow_digits && text == "0" {
        Some(false)
    } else {
        None
    }
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue::Boolean(v)
    }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        JsonValue::Number(Number::from(v))
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue::String(v)
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue::String(v.to_string())
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_native())
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_native().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(JsonValue::from_native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_number_text_preserved() {
        let value = JsonValue::parse(r#"{"n": 123.450000000000000}"#).unwrap();
        let n = value.as_object().unwrap()["n"].as_number().unwrap();
        assert_eq!(n.as_str(), "123.450000000000000");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"n":123.450000000000000}"#
        );
    }

    #[test]
    fn test_native_round_trip() {
        let text = r#"[null,"x",-1.50,true,{"a":[1,2e3]}]"#;
        let value = JsonValue::parse(text).unwrap();
        assert_eq!(value.to_native().to_string(), text);
        assert_eq!(JsonValue::from_native(value.to_native()), value);
    }

    #[test]
    fn test_number_parse_validation() {
        assert!(Number::parse("-0.5").is_ok());
        assert!(Number::parse("1e-7").is_ok());
        assert!(Number::parse("01").is_err());
        assert!(Number::parse("1.").is_err());
        assert!(Number::parse("abc").is_err());
        assert!(Number::parse("").is_err());
    }

    #[test]
    fn test_as_i64_integral_only() {
        assert_eq!(JsonValue::number("42").unwrap().as_i64().unwrap(), 42);
        assert_eq!(JsonValue::number("-7.000").unwrap().as_i64().unwrap(), -7);

        let err = JsonValue::number("1.5").unwrap().as_i64().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConversion);
        assert!(JsonValue::number("1e3").unwrap().as_i64().is_err());
    }

    #[test]
    fn test_coercion_matrix_null() {
        let null = JsonValue::Null;
        assert_eq!(null.as_string().unwrap(), "");
        assert!(!null.as_bool().unwrap());
        assert_eq!(null.as_i64().unwrap(), 0);
        assert_eq!(null.as_f64().unwrap(), 0.0);
    }

    #[test]
    fn test_coercion_matrix_boolean() {
        let t = JsonValue::Boolean(true);
        assert_eq!(t.as_i64().unwrap(), 1);
        assert_eq!(t.as_f64().unwrap(), 1.0);
        assert_eq!(t.as_string().unwrap(), "true");
        assert_eq!(JsonValue::Boolean(false).as_string().unwrap(), "false");
    }

    #[test]
    fn test_coercion_matrix_string_to_bool() {
        assert!(JsonValue::from("TRUE").as_bool().unwrap());
        assert!(!JsonValue::from("False").as_bool().unwrap());
        assert!(JsonValue::from("1").as_bool().is_err());
        assert!(JsonValue::from("1").as_db_bool().unwrap());
        assert!(!JsonValue::from("0").as_db_bool().unwrap());
        assert!(JsonValue::from("yes").as_db_bool().is_err());
    }

    #[test]
    fn test_coercion_matrix_number_to_bool() {
        assert!(JsonValue::number("0.5").unwrap().as_bool().unwrap());
        assert!(!JsonValue::number("-0.00").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_string_numeric_parse_reports_failure() {
        assert_eq!(JsonValue::from("17").as_i64().unwrap(), 17);
        assert_eq!(JsonValue::from("2.5").as_f64().unwrap(), 2.5);
        assert!(JsonValue::from("seventeen").as_i64().is_err());
        assert!(JsonValue::from("").as_f64().is_err());
    }

    #[test]
    fn test_containers_never_coerce() {
        let arr = JsonValue::Array(vec![]);
        let obj = JsonValue::Object(BTreeMap::new());
        for value in [arr, obj] {
            assert!(value.as_string().is_err());
            assert!(value.as_bool().is_err());
            assert!(value.as_i64().is_err());
            assert!(value.as_f64().is_err());
            assert!(value.as_decimal().is_err());
        }
    }

    #[test]
    fn test_as_decimal_keeps_scale() {
        let d = JsonValue::number("123.450000000000000")
            .unwrap()
            .as_decimal()
            .unwrap();
        assert_eq!(d.to_string(), "123.450000000000000");
        assert_eq!(
            JsonValue::number("1.5e2").unwrap().as_decimal().unwrap(),
            Decimal::from(150)
        );
    }

    #[test]
    fn test_number_from_f64() {
        assert_eq!(Number::try_from(-123.45).unwrap().as_str(), "-123.45");
        assert_eq!(Number::try_from(1.0).unwrap().as_str(), "1");
        assert!(Number::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_accessor_mismatch_names_types() {
        let err = JsonValue::from("x").as_array().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot convert string to array: no coercion between these types"
        );
    }
}
