use rusqlite::Error as RusqliteError;
use thiserror::Error;

use crate::schema::Dialect;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError), // Converts rusqlite::Error automatically

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database is not initialized: table '{table}' not found")]
    NotInitialized { table: String },

    #[error("Database schema version {stored} is newer than the supported version {target}, downgrade is not supported")]
    UnsupportedDowngrade { stored: i64, target: i64 },

    #[error("Database version not handled: {0}")]
    UnknownVersion(i64),

    #[error("Schema upgrade {from} -> {to} failed on statement {statement}: {source}")]
    StepFailed {
        from: i64,
        to: i64,
        statement: usize,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Schema version table error: {0}")]
    VersionStore(String),

    #[error("Schema version table must hold exactly one row, found {0}")]
    VersionRowCount(i64),

    #[error("Schema version changed during upgrade: expected {expected}, found {found}")]
    VersionChanged { expected: i64, found: i64 },

    #[error("Unresolved placeholder '{0}' in statement template")]
    UnresolvedPlaceholder(String),

    #[error("Invalid migration step table: {0}")]
    InvalidStepTable(String),

    #[error("{0} support is not available in this build")]
    BackendUnavailable(Dialect),

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}

impl SchemaError {
    /// Only a missing version table can be recovered from, by running the
    /// base schema creation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SchemaError::NotInitialized { .. })
    }
}

impl From<figment::Error> for SchemaError {
    fn from(err: figment::Error) -> Self {
        SchemaError::ConfigError(err.to_string())
    }
}
