//! Dump/init orchestrator.
//!
//! Every call runs inside one transaction on the wrapped [`Database`]. Dump
//! introspects and lists each requested table; init introspects, clears and
//! loads each fixture entry. The first failure rolls the whole call back.

use std::collections::BTreeMap;

use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn, Dispatch};

use crate::core::bridge::row_to_json;
use crate::core::schema::{dependency_order, JsonRow, Schema, TableRows, Tables};
use crate::core::traits::{Database, FixtureTransaction};
use crate::error::{Result, ResultExt};

/// Runs dump and init against a database.
pub struct Orchestrator<D: Database> {
    db: D,
    dispatch: Dispatch,
}

impl<D: Database> Orchestrator<D> {
    /// Wrap a connected database. Logging is discarded until
    /// [`with_dispatch`](Self::with_dispatch) is called.
    pub fn new(db: D) -> Self {
        Self {
            db,
            dispatch: Dispatch::none(),
        }
    }

    /// Route this orchestrator's log output to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn into_inner(self) -> D {
        self.db
    }

    /// Read every row of `tables`, keyed by table name.
    ///
    /// A table without columns (usually a missing table) dumps as `[]`.
    pub async fn dump(&mut self, tables: &[String]) -> Result<Tables> {
        let dispatch = self.dispatch.clone();
        let driver = self.db.name().to_string();
        async move {
            info!(driver = %driver, tables = tables.len(), "dump started");
            let mut tx = self.db.begin().await?;
            let result = dump_tables(&mut tx, tables).await;
            let dumped = finish(tx, result).await?;
            info!(tables = dumped.len(), "dump complete");
            Ok(dumped)
        }
        .with_subscriber(dispatch)
        .await
    }

    /// Replace the rows of each entry's table with the entry's rows.
    ///
    /// Entries run in input order unless `sort_by_references` is set, in
    /// which case tables are cleared children-first and loaded parents-first
    /// according to their introspected foreign keys. Returns the number of
    /// rows inserted.
    pub async fn init(&mut self, entries: &[TableRows], sort_by_references: bool) -> Result<u64> {
        let dispatch = self.dispatch.clone();
        let driver = self.db.name().to_string();
        async move {
            info!(driver = %driver, entries = entries.len(), sort_by_references, "init started");
            let mut tx = self.db.begin().await?;
            let result = if sort_by_references {
                init_sorted(&mut tx, entries).await
            } else {
                init_in_order(&mut tx, entries).await
            };
            let inserted = finish(tx, result).await?;
            info!(rows = inserted, "init complete");
            Ok(inserted)
        }
        .with_subscriber(dispatch)
        .await
    }
}

/// Commit on success, roll back on failure. The operation's error wins over a
/// failed rollback.
async fn finish<T: FixtureTransaction, R>(tx: T, result: Result<R>) -> Result<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            warn!(error = %e, "rolling back");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn dump_tables<T: FixtureTransaction>(tx: &mut T, names: &[String]) -> Result<Tables> {
    let mut tables = Tables::new();
    for name in names {
        let schema = tx.get_schema(name).await.context("table", name)?;
        if schema.is_empty() {
            warn!(table = %name, "table has no columns, dumping no rows");
            tables.insert(name.clone(), Vec::new());
            continue;
        }

        let rows = tx.list_rows(&schema).await.context("table", name)?;
        let json = rows
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>>>()
            .context("table", name)?;
        debug!(table = %name, rows = json.len(), "dumped table");
        tables.insert(name.clone(), json);
    }
    Ok(tables)
}

async fn init_in_order<T: FixtureTransaction>(tx: &mut T, entries: &[TableRows]) -> Result<u64> {
    let mut inserted = 0;
    for entry in entries {
        let schema = tx.get_schema(&entry.name).await.context("table", &entry.name)?;
        if schema.is_empty() {
            warn!(table = %entry.name, "table has no columns, skipping");
            continue;
        }
        inserted += load_table(tx, &schema, &entry.rows).await?;
    }
    Ok(inserted)
}

async fn init_sorted<T: FixtureTransaction>(tx: &mut T, entries: &[TableRows]) -> Result<u64> {
    // Repeated names merge into one load, rows kept in input order.
    let mut rows_by_table: BTreeMap<&str, Vec<JsonRow>> = BTreeMap::new();
    let mut schemas = Vec::new();
    for entry in entries {
        if !rows_by_table.contains_key(entry.name.as_str()) {
            let schema = tx.get_schema(&entry.name).await.context("table", &entry.name)?;
            if schema.is_empty() {
                warn!(table = %entry.name, "table has no columns, skipping");
                continue;
            }
            schemas.push(schema);
        }
        rows_by_table
            .entry(entry.name.as_str())
            .or_default()
            .extend(entry.rows.iter().cloned());
    }

    let order = dependency_order(&schemas);
    debug!(order = ?order, "load order");
    let schema_of = |name: &str| schemas.iter().find(|s| s.table == name);

    for name in order.iter().rev() {
        if let Some(schema) = schema_of(name) {
            tx.clear_rows(schema).await.context("table", name)?;
        }
    }

    let mut inserted = 0;
    for name in &order {
        if let (Some(schema), Some(rows)) = (schema_of(name), rows_by_table.get(name.as_str())) {
            let count = tx.create_rows(schema, rows).await.context("table", name)?;
            debug!(table = %name, rows = count, "loaded table");
            inserted += count;
        }
    }
    Ok(inserted)
}

async fn load_table<T: FixtureTransaction>(
    tx: &mut T,
    schema: &Schema,
    rows: &[JsonRow],
) -> Result<u64> {
    tx.clear_rows(schema).await.context("table", &schema.table)?;
    let count = tx
        .create_rows(schema, rows)
        .await
        .context("table", &schema.table)?;
    debug!(table = %schema.table, rows = count, "loaded table");
    Ok(count)
}
