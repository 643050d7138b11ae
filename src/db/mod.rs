pub mod migration;
mod pool;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::SchemaError;

pub use pool::{open_sqlite_pool, SqlitePool};

/// The raw SQL surface the migration engine needs from a backend.
///
/// Statements arrive fully rendered. Implementations only have to run them.
pub trait SqlHandle {
    type Transaction<'a>: SqlTransaction
    where
        Self: 'a;

    /// Runs a query expected to return exactly one row and returns its
    /// columns as nullable integers.
    fn query_integers(&mut self, sql: &str) -> Result<Vec<Option<i64>>, SchemaError>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, SchemaError>;
}

/// A transaction borrowed from a [`SqlHandle`]. Dropping it without
/// committing must roll it back.
pub trait SqlTransaction {
    fn execute(&mut self, sql: &str) -> Result<(), SchemaError>;

    fn query_integers(&mut self, sql: &str) -> Result<Vec<Option<i64>>, SchemaError>;

    fn commit(self) -> Result<(), SchemaError>
    where
        Self: Sized;

    fn rollback(self) -> Result<(), SchemaError>
    where
        Self: Sized;
}

fn query_integers(conn: &Connection, sql: &str) -> Result<Vec<Option<i64>>, SchemaError> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let values = stmt.query_row([], |row| {
        (0..column_count)
            .map(|i| row.get::<_, Option<i64>>(i))
            .collect::<Result<Vec<_>, _>>()
    })?;
    Ok(values)
}

impl SqlHandle for Connection {
    type Transaction<'a> = rusqlite::Transaction<'a>;

    fn query_integers(&mut self, sql: &str) -> Result<Vec<Option<i64>>, SchemaError> {
        query_integers(self, sql)
    }

    fn begin(&mut self) -> Result<Self::Transaction<'_>, SchemaError> {
        // Take the write lock up front: a migration is the only writer.
        let tx = self.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(tx)
    }
}

impl SqlTransaction for Transaction<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), SchemaError> {
        self.execute_batch(sql)?;
        Ok(())
    }

    fn query_integers(&mut self, sql: &str) -> Result<Vec<Option<i64>>, SchemaError> {
        query_integers(self, sql)
    }

    fn commit(self) -> Result<(), SchemaError> {
        Transaction::commit(self)?;
        Ok(())
    }

    fn rollback(self) -> Result<(), SchemaError> {
        Transaction::rollback(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_integers_returns_every_column() {
        let mut conn = Connection::open_in_memory().unwrap();
        let row = SqlHandle::query_integers(&mut conn, "SELECT 1, NULL, 42").unwrap();
        assert_eq!(row, vec![Some(1), None, Some(42)]);
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        {
            let mut tx = conn.begin().unwrap();
            tx.execute("CREATE TABLE t (id INTEGER)").unwrap();
        }
        let row = SqlHandle::query_integers(
            &mut conn,
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 't'",
        )
        .unwrap();
        assert_eq!(row, vec![Some(0)]);
    }

    #[test]
    fn test_committed_transaction_persists() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut tx = conn.begin().unwrap();
        tx.execute("CREATE TABLE t (id INTEGER)").unwrap();
        tx.execute("INSERT INTO t (id) VALUES (7)").unwrap();
        assert_eq!(tx.query_integers("SELECT MAX(id) FROM t").unwrap(), vec![Some(7)]);
        SqlTransaction::commit(tx).unwrap();

        let row = SqlHandle::query_integers(&mut conn, "SELECT COUNT(*) FROM t").unwrap();
        assert_eq!(row, vec![Some(1)]);
    }
}
