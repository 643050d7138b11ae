use log::debug;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use super::Provider;
use crate::config::Config;
use crate::db::migration::{MigrationProgress, Migrator, Outcome, SchemaStatus};
use crate::db::{open_sqlite_pool, SqlHandle, SqlitePool};
use crate::error::SchemaError;
use crate::schema::Dialect;

/// SQLite adapter. Every call checks one connection out of the pool and
/// holds it until the call returns, so migration statements never share a
/// connection with other work.
pub struct SqliteProvider {
    pool: SqlitePool,
    migrator: Migrator,
}

impl SqliteProvider {
    pub fn open(config: &Config, progress: MigrationProgress) -> Result<Self, SchemaError> {
        let migrator = Migrator::new(
            Dialect::Sqlite.scripts(),
            config.provider.tables.clone(),
        )?
        .with_progress(progress);

        let path = config.database_path();
        let pool = open_sqlite_pool(
            &path,
            config.provider.pool_size,
            config.provider.query_timeout(),
        )?;

        Ok(Self { pool, migrator })
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, SchemaError> {
        Ok(self.pool.get()?)
    }
}

impl Provider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn check_availability(&self) -> Result<(), SchemaError> {
        let mut conn = self.connection()?;
        conn.query_integers("SELECT 1")?;
        debug!("sqlite provider is available");
        Ok(())
    }

    fn schema_status(&self) -> Result<SchemaStatus, SchemaError> {
        let mut conn = self.connection()?;
        self.migrator.schema_status(&mut *conn)
    }

    fn initialize(&self) -> Result<Outcome, SchemaError> {
        let mut conn = self.connection()?;
        self.migrator.initialize(&mut *conn)
    }

    fn migrate(&self) -> Result<Outcome, SchemaError> {
        let mut conn = self.connection()?;
        self.migrator.migrate(&mut *conn)
    }

    fn ensure_current(&self) -> Result<Outcome, SchemaError> {
        let mut conn = self.connection()?;
        self.migrator.ensure_current(&mut *conn)
    }
}
