//! Schema Compare - MySQL / MariaDB schema comparison engine
//!
//! Introspects a source and a destination database, diffs tables,
//! columns, constraints, triggers, procedures, functions, events and views
//! in both directions, and writes one reviewable DDL script per side.

pub mod config;
pub mod connection;
pub mod error;
pub mod introspection;
pub mod migration;
pub mod pipeline;
pub mod script;
pub mod snapshot;
pub mod sql;

#[cfg(test)]
mod testing;

pub use connection::{Catalog, ConnectionLabel, MySqlCatalog};
pub use error::{AppError, AppResult};
pub use pipeline::{Comparison, ComparisonReport};
