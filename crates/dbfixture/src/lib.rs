//! # dbfixture
//!
//! Load, dump and compare JSON database fixtures for regression tests.
//!
//! This library provides:
//!
//! - **Init**: replace the rows of each listed table with fixture rows
//! - **Dump**: read tables back out as JSON, ordered by primary key
//! - **Compare**: diff two JSON documents with full/superset matching
//! - **Typed value bridge** between JSON and MySQL, PostgreSQL, SQLite and
//!   Spanner columns, driven by schema introspected at runtime
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbfixture::{DriverImpl, DriverKind, Orchestrator, SslMode, TableRows};
//!
//! #[tokio::main]
//! async fn main() -> dbfixture::Result<()> {
//!     let db = DriverImpl::connect(DriverKind::Sqlite, "sqlite://test.db", SslMode::Disable).await?;
//!     let mut orchestrator = Orchestrator::new(db);
//!
//!     let fixture: Vec<TableRows> =
//!         serde_json::from_str(r#"[{"name": "users", "rows": [{"id": 1, "name": "ada"}]}]"#)?;
//!     orchestrator.init(&fixture, false).await?;
//!
//!     let tables = orchestrator.dump(&["users".to_string()]).await?;
//!     println!("{}", serde_json::to_string(&tables)?);
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod orchestrator;

// Re-exports for convenient access
pub use compare::{compare, Comparison, Difference, Outcome};
pub use config::{Config, ConfigOverrides};
pub use crate::core::{ColumnType, ColumnValue, JsonRow, JsonValue, Schema, TableRows, Tables};
pub use drivers::{DriverImpl, DriverKind, SslMode};
pub use error::{ErrorKind, FixtureError, Result};
pub use orchestrator::Orchestrator;
