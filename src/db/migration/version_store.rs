use log::warn;

use crate::db::{SqlHandle, SqlTransaction};
use crate::error::SchemaError;
use crate::schema::{render, SchemaScripts, TableNames, VERSION_TOKEN};

/// Reads the stored schema version.
///
/// Returns `None` when the version table does not exist. With
/// `show_init_warning` set, a missing table is additionally reported as a
/// likely skipped `initprovider` run.
pub fn read_version<H: SqlHandle>(
    handle: &mut H,
    scripts: &SchemaScripts,
    tables: &TableNames,
    show_init_warning: bool,
) -> Result<Option<i64>, SchemaError> {
    let exists_sql = render(scripts.table_exists, tables)?;
    let exists = handle
        .query_integers(&exists_sql)
        .map_err(|e| store_error("checking for", tables, e))?;

    if !matches!(exists.first(), Some(Some(count)) if *count > 0) {
        if show_init_warning {
            warn!(
                "schema version table '{}' not found, did you forget to run the \"initprovider\" command?",
                tables.schema_version
            );
        }
        return Ok(None);
    }

    let read_sql = render(scripts.read_version, tables)?;
    let row = handle
        .query_integers(&read_sql)
        .map_err(|e| store_error("reading", tables, e))?;
    parse_version_row(&row).map(Some)
}

/// Reads the stored version through an open transaction. The table must exist.
pub fn read_version_in<T: SqlTransaction>(
    tx: &mut T,
    scripts: &SchemaScripts,
    tables: &TableNames,
) -> Result<i64, SchemaError> {
    let read_sql = render(scripts.read_version, tables)?;
    let row = tx
        .query_integers(&read_sql)
        .map_err(|e| store_error("reading", tables, e))?;
    parse_version_row(&row)
}

/// Inserts the single version row, at version 1. Never opens its own
/// transaction.
pub fn seed_version<T: SqlTransaction>(
    tx: &mut T,
    scripts: &SchemaScripts,
    tables: &TableNames,
) -> Result<(), SchemaError> {
    let sql = render(scripts.seed_version, tables)?;
    tx.execute(&sql)
        .map_err(|e| store_error("seeding", tables, e))
}

/// Updates the version row inside the caller's transaction.
pub fn write_version<T: SqlTransaction>(
    tx: &mut T,
    scripts: &SchemaScripts,
    tables: &TableNames,
    version: i64,
) -> Result<(), SchemaError> {
    let template = scripts
        .update_version
        .replace(VERSION_TOKEN, &version.to_string());
    let sql = render(&template, tables)?;
    tx.execute(&sql)
        .map_err(|e| store_error("updating", tables, e))
}

/// The read query yields `(row count, max version)`; exactly one row is
/// allowed.
fn parse_version_row(row: &[Option<i64>]) -> Result<i64, SchemaError> {
    match row {
        [Some(1), Some(version)] => Ok(*version),
        [Some(1), None] => Err(SchemaError::VersionStore("version is NULL".to_string())),
        [Some(count), _] => Err(SchemaError::VersionRowCount(*count)),
        _ => Err(SchemaError::VersionStore(format!(
            "unexpected version row shape: {:?}",
            row
        ))),
    }
}

fn store_error(action: &str, tables: &TableNames, err: SchemaError) -> SchemaError {
    SchemaError::VersionStore(format!(
        "{} table '{}': {}",
        action, tables.schema_version, err
    ))
}
