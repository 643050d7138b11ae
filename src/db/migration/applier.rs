use log::{debug, warn, Level};
use logging_timer::timer;

use super::version_store;
use crate::db::{SqlHandle, SqlTransaction};
use crate::error::SchemaError;
use crate::schema::{render_all, Migration, SchemaScripts, TableNames, BASE_VERSION};

/// Creates the base schema and seeds the version row in one transaction.
///
/// Failures are reported as step `0 -> 1`; nothing of the base schema
/// survives a failure.
pub fn apply_base<H: SqlHandle>(
    handle: &mut H,
    scripts: &SchemaScripts,
    tables: &TableNames,
) -> Result<(), SchemaError> {
    let _tmr = timer!(Level::Debug; "apply_base", "{}", scripts.dialect);
    let statements = render_all(scripts.base, tables)?;

    let mut tx = handle.begin()?;
    let result = execute_all(&mut tx, &statements, 0, BASE_VERSION).and_then(|()| {
        version_store::seed_version(&mut tx, scripts, tables)
            .map_err(|e| step_failed(0, BASE_VERSION, statements.len() + 1, e))
    });

    finish(tx, result)
}

/// Applies one migration and records its target version, atomically.
///
/// The stored version is re-checked inside the transaction; a database that
/// moved on since the chain was resolved is left untouched.
pub fn apply_step<H: SqlHandle>(
    handle: &mut H,
    scripts: &SchemaScripts,
    tables: &TableNames,
    migration: &Migration,
) -> Result<(), SchemaError> {
    let (from, to) = (migration.from, migration.to());
    let _tmr = timer!(Level::Info; "apply_step", "{} -> {}", from, to);
    let statements = render_all(migration.statements, tables)?;

    let mut tx = handle.begin()?;
    let result = run_step(&mut tx, scripts, tables, &statements, from, to);

    finish(tx, result)
}

fn run_step<T: SqlTransaction>(
    tx: &mut T,
    scripts: &SchemaScripts,
    tables: &TableNames,
    statements: &[String],
    from: i64,
    to: i64,
) -> Result<(), SchemaError> {
    // Statement 0 is the version re-read that precedes the step's own SQL.
    let found = version_store::read_version_in(tx, scripts, tables)
        .map_err(|e| step_failed(from, to, 0, e))?;
    if found != from {
        return Err(SchemaError::VersionChanged {
            expected: from,
            found,
        });
    }
    execute_all(tx, statements, from, to)?;
    version_store::write_version(tx, scripts, tables, to)
        .map_err(|e| step_failed(from, to, statements.len() + 1, e))
}

/// Runs statements in order, stopping at the first failure.
fn execute_all<T: SqlTransaction>(
    tx: &mut T,
    statements: &[String],
    from: i64,
    to: i64,
) -> Result<(), SchemaError> {
    for (index, sql) in statements.iter().enumerate() {
        debug!("executing statement {} of step {} -> {}", index + 1, from, to);
        tx.execute(sql)
            .map_err(|e| step_failed(from, to, index + 1, e))?;
    }
    Ok(())
}

fn finish<T: SqlTransaction>(tx: T, result: Result<(), SchemaError>) -> Result<(), SchemaError> {
    match result {
        Ok(()) => tx.commit(),
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("error rolling back transaction: {}", rollback_err);
            }
            Err(err)
        }
    }
}

fn step_failed(from: i64, to: i64, statement: usize, source: SchemaError) -> SchemaError {
    SchemaError::StepFailed {
        from,
        to,
        statement,
        source: Box::new(source),
    }
}
