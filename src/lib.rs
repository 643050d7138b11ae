//! Versioned schema migrations for SQL-backed user and folder stores.
//!
//! A database is brought to the current schema version by creating the base
//! schema once (`initialize`) and then applying every upgrade step between
//! the stored and the expected version (`migrate`). Statements come from
//! per-dialect templates whose table-role placeholders are filled in from
//! the configured [`schema::TableNames`].

pub mod config;
pub mod db;
pub mod error;
pub mod provider;
pub mod schema;
pub mod version;

pub use db::migration::{MigrationMessage, MigrationProgress, Migrator, Outcome, SchemaStatus};
pub use error::SchemaError;
pub use provider::Provider;
pub use schema::{Dialect, TableNames};
