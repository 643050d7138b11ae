use std::path::Path;
use std::time::Duration;

use log::debug;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::SchemaError;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Opens a pool over the SQLite database at `path`.
///
/// `query_timeout` bounds both the wait for a pooled connection and how long
/// a statement waits on a locked database.
pub fn open_sqlite_pool(
    path: &Path,
    pool_size: u32,
    query_timeout: Duration,
) -> Result<SqlitePool, SchemaError> {
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.busy_timeout(query_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });

    let pool = Pool::builder()
        .max_size(pool_size)
        .connection_timeout(query_timeout)
        .build(manager)?;

    debug!(
        "sqlite database handle created, path: {}, pool size: {}",
        path.display(),
        pool_size
    );

    Ok(pool)
}
