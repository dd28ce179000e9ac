//! Utilities shared across database drivers.
//!
//! - [`tls`]: TLS configuration for PostgreSQL, Spanner and MySQL connections
//! - [`pg`]: tokio-postgres plumbing shared by the PostgreSQL and Spanner drivers

pub mod pg;
pub mod tls;

pub use tls::{SslMode, TlsBuilder};
