//! Table metadata and row containers.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::json::JsonValue;
use super::value::{ColumnType, ColumnValue};
use crate::error::{FixtureError, Result};

/// A fixture or dump row: column name to JSON value.
pub type JsonRow = BTreeMap<String, JsonValue>;

/// A row as read from the database: column name to typed cell.
pub type ColumnRow = BTreeMap<String, ColumnValue>;

/// Dump output: table name to its rows in primary-key order.
pub type Tables = BTreeMap<String, Vec<JsonRow>>;

/// One init entry: a table and the rows it should contain afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<JsonRow>,
}

impl TableRows {
    pub fn new(name: impl Into<String>, rows: Vec<JsonRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Vendor type as reported by the catalog (e.g. `tinyint(1)`, `numeric`).
    pub data_type: String,
    /// Canonical type derived from `data_type`.
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        column_type: ColumnType,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            column_type,
        }
    }

    /// Whether the vendor type is an exact fixed-point number.
    pub fn is_exact_numeric(&self) -> bool {
        let upper = self.data_type.trim().to_ascii_uppercase();
        upper.starts_with("NUMERIC") || upper.starts_with("DECIMAL")
    }
}

/// Introspected table schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Table name as given by the caller.
    pub table: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Primary-key column names in key order. May be empty.
    pub primary_keys: Vec<String>,
    /// Tables this table holds foreign keys to.
    pub references: Vec<String>,
}

impl Schema {
    /// Build a schema, checking that column names are unique and that every
    /// primary-key column exists.
    pub fn from_parts(
        table: impl Into<String>,
        columns: Vec<Column>,
        primary_keys: Vec<String>,
        mut references: Vec<String>,
    ) -> Result<Self> {
        let table = table.into();
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(FixtureError::BadArgs(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, table
                )));
            }
        }
        for pk in &primary_keys {
            if !seen.contains(pk.as_str()) {
                return Err(FixtureError::bad_key(pk, format!("columns of table {}", table)));
            }
        }
        references.sort();
        references.dedup();

        Ok(Self {
            table,
            columns,
            primary_keys,
            references,
        })
    }

    /// An empty schema means the table does not exist or has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }
}

/// Order tables so that referenced tables come before the tables that
/// reference them.
///
/// Independent tables keep their input order. References to tables outside the
/// input are ignored, as are self-references. Tables caught in a reference
/// cycle are appended in input order.
pub fn dependency_order(schemas: &[Schema]) -> Vec<String> {
    let mut names: Vec<&str> = Vec::new();
    for schema in schemas {
        if !names.contains(&schema.table.as_str()) {
            names.push(&schema.table);
        }
    }

    let mut pending: HashMap<&str, HashSet<&str>> = HashMap::new();
    for schema in schemas {
        let deps = pending.entry(schema.table.as_str()).or_default();
        for r in &schema.references {
            if r != &schema.table && names.contains(&r.as_str()) {
                deps.insert(r.as_str());
            }
        }
    }

    let mut ordered: Vec<String> = Vec::with_capacity(names.len());
    let mut placed: HashSet<&str> = HashSet::new();
    loop {
        let next = names.iter().copied().find(|n| {
            !placed.contains(n)
                && pending
                    .get(n)
                    .map_or(true, |deps| deps.iter().all(|d| placed.contains(d)))
        });
        match next {
            Some(name) => {
                placed.insert(name);
                ordered.push(name.to_string());
            }
            None => break,
        }
    }

    for name in names {
        if !placed.contains(name) {
            ordered.push(name.to_string());
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(table: &str, references: &[&str]) -> Schema {
        Schema::from_parts(
            table,
            vec![Column::new("id", "integer", ColumnType::Integer)],
            vec!["id".into()],
            references.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_unknown_pk() {
        let err = Schema::from_parts(
            "t",
            vec![Column::new("a", "int", ColumnType::Integer)],
            vec!["b".into()],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadKeyAccess);
    }

    #[test]
    fn test_from_parts_rejects_duplicate_columns() {
        let cols = vec![
            Column::new("a", "int", ColumnType::Integer),
            Column::new("a", "text", ColumnType::String),
        ];
        assert!(Schema::from_parts("t", cols, vec![], vec![]).is_err());
    }

    #[test]
    fn test_column_lookup() {
        let s = schema("t", &[]);
        assert_eq!(s.column_type("id"), Some(ColumnType::Integer));
        assert_eq!(s.column_type("missing"), None);
        assert!(s.has_primary_key());
        assert!(!s.is_empty());
        assert!(Schema::default().is_empty());
    }

    #[test]
    fn test_exact_numeric() {
        assert!(Column::new("c", "numeric(30,15)", ColumnType::Float).is_exact_numeric());
        assert!(Column::new("c", "DECIMAL(10,2)", ColumnType::Float).is_exact_numeric());
        assert!(!Column::new("c", "double precision", ColumnType::Float).is_exact_numeric());
    }

    #[test]
    fn test_dependency_order_parents_first() {
        let schemas = vec![
            schema("orders", &["customers", "products"]),
            schema("customers", &[]),
            schema("products", &["vendors"]),
            schema("vendors", &[]),
        ];
        assert_eq!(
            dependency_order(&schemas),
            vec!["customers", "vendors", "products", "orders"]
        );
    }

    #[test]
    fn test_dependency_order_ignores_self_and_outside_references() {
        let schemas = vec![schema("tree", &["tree", "elsewhere"]), schema("leaf", &[])];
        assert_eq!(dependency_order(&schemas), vec!["tree", "leaf"]);
    }

    #[test]
    fn test_dependency_order_keeps_cycles() {
        let schemas = vec![schema("a", &["b"]), schema("b", &["a"]), schema("c", &[])];
        assert_eq!(dependency_order(&schemas), vec!["c", "a", "b"]);
    }
}
