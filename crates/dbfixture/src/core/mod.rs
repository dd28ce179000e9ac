//! Core abstractions shared by every driver.
//!
//! - [`json`]: canonical JSON value model with the coercion matrix
//! - [`value`]: canonical column types and driver values
//! - [`schema`]: table metadata and row containers
//! - [`bridge`]: JSON to relational conversion in both directions
//! - [`traits`]: dialect and row-operation traits implemented by drivers

pub mod bridge;
pub mod json;
pub mod schema;
pub mod traits;
pub mod value;

pub use bridge::{column_to_json, insert_batches, json_to_param, row_to_json, InsertBatch};
pub use json::{JsonType, JsonValue, Number};
pub use schema::{dependency_order, Column, ColumnRow, JsonRow, Schema, TableRows, Tables};
pub use traits::{
    finish_scoped, Database, Dialect, FixtureTransaction, RowClearer, RowCreator, RowLister,
    SchemaIntrospector,
};
pub use value::{format_timestamp, parse_timestamp, ColumnType, ColumnValue, DriverValue, Param};
