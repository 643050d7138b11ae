//! Backend adapters exposing schema setup to the rest of the application.
//!
//! Each dialect with a linked driver provides a [`Provider`]. Dialects
//! without one still have templates, but [`open`] fails fast for them with
//! [`SchemaError::BackendUnavailable`].

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(not(feature = "sqlite"))]
mod sqlite_disabled;

use log::debug;

use crate::config::Config;
use crate::db::migration::{MigrationProgress, Outcome, SchemaStatus};
use crate::error::SchemaError;
use crate::schema::Dialect;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteProvider;

pub trait Provider {
    fn dialect(&self) -> Dialect;

    /// Verifies that a connection can be obtained and used.
    fn check_availability(&self) -> Result<(), SchemaError>;

    fn schema_status(&self) -> Result<SchemaStatus, SchemaError>;

    fn initialize(&self) -> Result<Outcome, SchemaError>;

    fn migrate(&self) -> Result<Outcome, SchemaError>;

    fn ensure_current(&self) -> Result<Outcome, SchemaError>;
}

/// Opens the provider selected by the configuration.
pub fn open(config: &Config, progress: MigrationProgress) -> Result<Box<dyn Provider>, SchemaError> {
    let dialect = config.provider.dialect()?;
    debug!("opening {} provider", dialect);

    match dialect {
        #[cfg(feature = "sqlite")]
        Dialect::Sqlite => Ok(Box::new(SqliteProvider::open(config, progress)?)),
        #[cfg(not(feature = "sqlite"))]
        Dialect::Sqlite => sqlite_disabled::open(config, progress),
        Dialect::Mssql | Dialect::Postgresql | Dialect::Mysql => {
            Err(SchemaError::BackendUnavailable(dialect))
        }
    }
}

/// Whether a dialect's adapter is compiled into this build.
pub fn is_available(dialect: Dialect) -> bool {
    match dialect {
        Dialect::Sqlite => cfg!(feature = "sqlite"),
        Dialect::Mssql | Dialect::Postgresql | Dialect::Mysql => false,
    }
}
