//! Dialect utilities shared by the drivers.
//!
//! - [`canonical`]: vendor type name to canonical column type classification

pub mod canonical;

pub use canonical::{classify, classify_mysql};
