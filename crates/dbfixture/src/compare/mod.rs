//! JSON document comparison.
//!
//! Compares an expected document against an actual one and reports whether
//! they match exactly, whether the actual document is a superset of the
//! expected one, or where they differ.
//!
//! Numbers compare by decimal value (`1.0` equals `1`), object key order is
//! ignored and array order is significant. A superset may carry extra object
//! keys and extra trailing array elements.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::json::{JsonValue, Number};

/// Overall result of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    FullMatch,
    SupersetMatch,
    NoMatch,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::FullMatch => "full match",
            Outcome::SupersetMatch => "superset match",
            Outcome::NoMatch => "no match",
            Outcome::Error => "error",
        };
        f.write_str(name)
    }
}

/// One difference between the documents, located by a JSONPath-like path.
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    /// Both sides have a value but they differ.
    Mismatch {
        path: String,
        expected: JsonValue,
        actual: JsonValue,
    },
    /// The expected value has no counterpart in the actual document.
    Missing { path: String, expected: JsonValue },
    /// The actual document has a value the expected one does not mention.
    Extra { path: String, actual: JsonValue },
}

impl Difference {
    pub fn path(&self) -> &str {
        match self {
            Difference::Mismatch { path, .. }
            | Difference::Missing { path, .. }
            | Difference::Extra { path, .. } => path,
        }
    }

    fn is_extra(&self) -> bool {
        matches!(self, Difference::Extra { .. })
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Mismatch {
                path,
                expected,
                actual,
            } => write!(f, "{}: expected {}, actual {}", path, expected, actual),
            Difference::Missing { path, expected } => {
                write!(f, "{}: missing, expected {}", path, expected)
            }
            Difference::Extra { path, actual } => write!(f, "{}: unexpected {}", path, actual),
        }
    }
}

/// Result of [`compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub outcome: Outcome,
    pub differences: Vec<Difference>,
    /// Annotated diff, one line per difference. For [`Outcome::Error`] this
    /// holds the parse error instead.
    pub diff: String,
}

impl Comparison {
    /// Whether the outcome counts as a match. `strict` rejects supersets.
    pub fn is_match(&self, strict: bool) -> bool {
        match self.outcome {
            Outcome::FullMatch => true,
            Outcome::SupersetMatch => !strict,
            Outcome::NoMatch | Outcome::Error => false,
        }
    }

    fn error(diff: String) -> Self {
        Self {
            outcome: Outcome::Error,
            differences: Vec::new(),
            diff,
        }
    }
}

/// Compare two JSON documents given as raw bytes.
pub fn compare(expected: &[u8], actual: &[u8]) -> Comparison {
    let expected = match parse(expected) {
        Ok(v) => v,
        Err(e) => return Comparison::error(format!("expected document is not valid JSON: {}", e)),
    };
    let actual = match parse(actual) {
        Ok(v) => v,
        Err(e) => return Comparison::error(format!("actual document is not valid JSON: {}", e)),
    };
    compare_values(&expected, &actual)
}

/// Compare two already parsed documents.
pub fn compare_values(expected: &JsonValue, actual: &JsonValue) -> Comparison {
    let mut differences = Vec::new();
    walk("$", expected, actual, &mut differences);

    let outcome = if differences.is_empty() {
        Outcome::FullMatch
    } else if differences.iter().all(Difference::is_extra) {
        Outcome::SupersetMatch
    } else {
        Outcome::NoMatch
    };
    let diff = differences
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    Comparison {
        outcome,
        differences,
        diff,
    }
}

fn parse(bytes: &[u8]) -> serde_json::Result<JsonValue> {
    serde_json::from_slice::<serde_json::Value>(bytes).map(JsonValue::from_native)
}

fn walk(path: &str, expected: &JsonValue, actual: &JsonValue, out: &mut Vec<Difference>) {
    match (expected, actual) {
        (JsonValue::Object(exp), JsonValue::Object(act)) => {
            for (key, e) in exp {
                let child = format!("{}.{}", path, key);
                match act.get(key) {
                    Some(a) => walk(&child, e, a, out),
                    None => out.push(Difference::Missing {
                        path: child,
                        expected: e.clone(),
                    }),
                }
            }
            for (key, a) in act {
                if !exp.contains_key(key) {
                    out.push(Difference::Extra {
                        path: format!("{}.{}", path, key),
                        actual: a.clone(),
                    });
                }
            }
        }
        (JsonValue::Array(exp), JsonValue::Array(act)) => {
            for (idx, e) in exp.iter().enumerate() {
                let child = format!("{}[{}]", path, idx);
                match act.get(idx) {
                    Some(a) => walk(&child, e, a, out),
                    None => out.push(Difference::Missing {
                        path: child,
                        expected: e.clone(),
                    }),
                }
            }
            for (idx, a) in act.iter().enumerate().skip(exp.len()) {
                out.push(Difference::Extra {
                    path: format!("{}[{}]", path, idx),
                    actual: a.clone(),
                });
            }
        }
        (JsonValue::Number(e), JsonValue::Number(a)) => {
            if !numbers_equal(e, a) {
                out.push(mismatch(path, expected, actual));
            }
        }
        _ => {
            if expected != actual {
                out.push(mismatch(path, expected, actual));
            }
        }
    }
}

fn mismatch(path: &str, expected: &JsonValue, actual: &JsonValue) -> Difference {
    Difference::Mismatch {
        path: path.to_string(),
        expected: expected.clone(),
        actual: actual.clone(),
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.as_str() == b.as_str() {
        return true;
    }
    match (to_decimal(a.as_str()), to_decimal(b.as_str())) {
        (Some(x), Some(y)) => x == y,
        // Out of Decimal range.
        _ => match (a.as_str().parse::<f64>(), b.as_str().parse::<f64>()) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        },
    }
}

fn to_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_documents_fully_match() {
        let doc = br#"{"t":[{"a":null,"b":1,"c":-123.45,"d":"x","e":true}]}"#;
        let result = compare(doc, doc);
        assert_eq!(result.outcome, Outcome::FullMatch);
        assert!(result.diff.is_empty());
    }

    #[test]
    fn test_key_order_and_number_spelling_are_ignored() {
        let result = compare(br#"{"a": 1, "b": 2.50}"#, br#"{"b": 2.5, "a": 1.0}"#);
        assert_eq!(result.outcome, Outcome::FullMatch);

        let result = compare(br#"[1e2]"#, br#"[100]"#);
        assert_eq!(result.outcome, Outcome::FullMatch);
    }

    #[test]
    fn test_extra_keys_and_trailing_elements_are_a_superset() {
        let result = compare(
            br#"{"t": [{"id": 1}]}"#,
            br#"{"t": [{"id": 1, "name": "x"}, {"id": 2}], "u": []}"#,
        );
        assert_eq!(result.outcome, Outcome::SupersetMatch);
        assert!(result.is_match(false));
        assert!(!result.is_match(true));
        let paths: Vec<&str> = result.differences.iter().map(|d| d.path()).collect();
        assert_eq!(paths, vec!["$.t[0].name", "$.t[1]", "$.u"]);
    }

    #[test]
    fn test_array_order_is_significant() {
        let result = compare(br#"[1, 2]"#, br#"[2, 1]"#);
        assert_eq!(result.outcome, Outcome::NoMatch);
        assert_eq!(result.differences.len(), 2);
    }

    #[test]
    fn test_no_match_reports_paths() {
        let result = compare(
            br#"{"t": [{"id": 1, "name": "a"}], "u": [{"id": 1}]}"#,
            br#"{"t": [{"id": 1, "name": "b"}]}"#,
        );
        assert_eq!(result.outcome, Outcome::NoMatch);
        assert!(!result.is_match(false));
        assert_eq!(
            result.diff,
            "$.t[0].name: expected \"a\", actual \"b\"\n$.u: missing, expected [{\"id\":1}]"
        );
    }

    #[test]
    fn test_shorter_actual_array_is_missing_elements() {
        let result = compare(br#"[1, 2, 3]"#, br#"[1]"#);
        assert_eq!(result.outcome, Outcome::NoMatch);
        assert!(matches!(
            &result.differences[0],
            Difference::Missing { path, .. } if path == "$[1]"
        ));
    }

    #[test]
    fn test_type_changes_do_not_match() {
        assert_eq!(compare(b"1", br#""1""#).outcome, Outcome::NoMatch);
        assert_eq!(compare(b"null", b"false").outcome, Outcome::NoMatch);
        assert_eq!(compare(br#"{"a": null}"#, b"{}").outcome, Outcome::NoMatch);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let result = compare(b"{", b"{}");
        assert_eq!(result.outcome, Outcome::Error);
        assert!(result.diff.starts_with("expected document"));

        let result = compare(b"{}", b"nope");
        assert_eq!(result.outcome, Outcome::Error);
        assert!(result.diff.starts_with("actual document"));
    }
}
