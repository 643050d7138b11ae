//! Schema version detection and incremental upgrades.
//!
//! A [`Migrator`] is built once per provider from a dialect's
//! [`SchemaScripts`] and the configured [`TableNames`]. It borrows a
//! [`SqlHandle`] per call and never keeps it.
//!
//! Each upgrade step runs in its own transaction together with the version
//! update, so the stored version always names the last step that fully
//! committed.

pub mod applier;
pub mod chain;
pub mod progress;
pub mod version_store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::db::SqlHandle;
use crate::error::SchemaError;
use crate::schema::{SchemaScripts, TableNames, BASE_VERSION};

pub use progress::{MigrationMessage, MigrationProgress};

/// Result of an `initialize` or `migrate` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do; the database is at `version`.
    NoActionRequired { version: i64 },
    /// The base schema was created.
    Initialized { version: i64 },
    /// `steps` upgrades were applied.
    Migrated { from: i64, to: i64, steps: usize },
    /// Stopped between steps by the interrupt flag.
    Interrupted { from: i64, reached: i64 },
}

impl Outcome {
    /// Whether the database was changed.
    pub fn is_change(&self) -> bool {
        match self {
            Outcome::NoActionRequired { .. } => false,
            Outcome::Initialized { .. } | Outcome::Migrated { .. } => true,
            Outcome::Interrupted { from, reached } => reached > from,
        }
    }
}

/// Stored and expected schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub stored: Option<i64>,
    pub target: i64,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.stored == Some(self.target)
    }
}

pub struct Migrator {
    scripts: &'static SchemaScripts,
    tables: TableNames,
    progress: MigrationProgress,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Migrator {
    pub fn new(scripts: &'static SchemaScripts, tables: TableNames) -> Result<Self, SchemaError> {
        scripts.validate()?;
        tables.validate()?;

        Ok(Self {
            scripts,
            tables,
            progress: MigrationProgress::silent(),
            interrupt: None,
        })
    }

    pub fn with_progress(mut self, progress: MigrationProgress) -> Self {
        self.progress = progress;
        self
    }

    /// The flag is only checked between steps, never during one.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn progress(&self) -> &MigrationProgress {
        &self.progress
    }

    pub fn target_version(&self) -> i64 {
        self.scripts.target_version()
    }

    pub fn schema_status<H: SqlHandle>(&self, handle: &mut H) -> Result<SchemaStatus, SchemaError> {
        let stored = version_store::read_version(handle, self.scripts, &self.tables, false)?;
        Ok(SchemaStatus {
            stored,
            target: self.target_version(),
        })
    }

    /// Creates the base schema at version 1 unless a version is already stored.
    pub fn initialize<H: SqlHandle>(&self, handle: &mut H) -> Result<Outcome, SchemaError> {
        if let Some(version) =
            version_store::read_version(handle, self.scripts, &self.tables, false)?
        {
            debug!("database already initialized, current version: {}", version);
            return Ok(Outcome::NoActionRequired { version });
        }

        info!(
            "creating {} base schema at version {}",
            self.scripts.dialect, BASE_VERSION
        );
        self.progress.send(&format!(
            "creating base schema, version {}",
            BASE_VERSION
        ));
        if let Err(err) = applier::apply_base(handle, self.scripts, &self.tables) {
            error!("error creating base schema: {}", err);
            self.progress.send_failed(&err.to_string());
            return Err(err);
        }

        Ok(Outcome::Initialized {
            version: BASE_VERSION,
        })
    }

    /// Brings an initialized database up to the target version.
    ///
    /// A database newer than this build, or at a version no step starts
    /// from, is refused before anything is executed.
    pub fn migrate<H: SqlHandle>(&self, handle: &mut H) -> Result<Outcome, SchemaError> {
        let target = self.target_version();
        let current = version_store::read_version(handle, self.scripts, &self.tables, true)?
            .ok_or_else(|| SchemaError::NotInitialized {
                table: self.tables.schema_version.clone(),
            })?;

        if current == target {
            debug!("sql database is up to date, current version: {}", current);
            return Ok(Outcome::NoActionRequired { version: current });
        }

        let chain = chain::resolve(self.scripts.migrations, current, target).inspect_err(|err| {
            error!("cannot migrate database from version {}: {}", current, err);
        })?;

        let mut reached = current;
        for migration in &chain {
            if self.is_interrupted() {
                warn!(
                    "migration interrupted at version {}, target was {}",
                    reached, target
                );
                self.progress
                    .send_error(&format!("migration interrupted at version {}", reached));
                return Ok(Outcome::Interrupted {
                    from: current,
                    reached,
                });
            }

            let msg = format!(
                "updating database version: {} -> {}",
                migration.from,
                migration.to()
            );
            info!("{}", msg);
            self.progress.send(&msg);

            if let Err(err) = applier::apply_step(handle, self.scripts, &self.tables, migration) {
                error!("{}", err);
                self.progress.send_failed(&err.to_string());
                return Err(err);
            }
            reached = migration.to();
        }

        info!("database migrated from version {} to {}", current, reached);
        self.progress.send_complete();

        Ok(Outcome::Migrated {
            from: current,
            to: reached,
            steps: chain.len(),
        })
    }

    /// Startup path: initialize when needed, then migrate.
    pub fn ensure_current<H: SqlHandle>(&self, handle: &mut H) -> Result<Outcome, SchemaError> {
        let initialized = self.initialize(handle)?;
        match self.migrate(handle)? {
            Outcome::NoActionRequired { .. } if initialized.is_change() => Ok(initialized),
            outcome => Ok(outcome),
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlTransaction;
    use crate::schema::{Dialect, Migration};
    use pretty_assertions::assert_eq;
    use rusqlite::Connection;

    fn sqlite_migrator() -> Migrator {
        Migrator::new(Dialect::Sqlite.scripts(), TableNames::default()).unwrap()
    }

    fn stored_version(conn: &mut Connection) -> Option<i64> {
        version_store::read_version(conn, Dialect::Sqlite.scripts(), &TableNames::default(), false)
            .unwrap()
    }

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            > 0
    }

    fn progress_lines(migrator: &Migrator) -> Vec<String> {
        migrator
            .progress()
            .history()
            .into_iter()
            .filter_map(|msg| match msg {
                MigrationMessage::Progress { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fresh_database_reaches_target_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();

        assert_eq!(
            migrator.initialize(&mut conn).unwrap(),
            Outcome::Initialized { version: 1 }
        );
        assert_eq!(stored_version(&mut conn), Some(1));

        assert_eq!(
            migrator.migrate(&mut conn).unwrap(),
            Outcome::Migrated {
                from: 1,
                to: 5,
                steps: 4
            }
        );
        assert_eq!(stored_version(&mut conn), Some(5));

        assert_eq!(
            progress_lines(&migrator),
            vec![
                "creating base schema, version 1",
                "updating database version: 1 -> 2",
                "updating database version: 2 -> 3",
                "updating database version: 3 -> 4",
                "updating database version: 4 -> 5",
            ]
        );
        assert_eq!(
            migrator.progress().history().last(),
            Some(&MigrationMessage::Complete)
        );

        assert!(table_exists(&conn, "folders"));
        assert!(table_exists(&conn, "folders_mapping"));
        let user_columns = column_names(&conn, "users");
        assert!(!user_columns.contains(&"virtual_folders".to_string()));
        assert!(user_columns.contains(&"filesystem".to_string()));
    }

    #[test]
    fn test_second_migrate_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();
        migrator.initialize(&mut conn).unwrap();
        migrator.migrate(&mut conn).unwrap();

        let outcome = migrator.migrate(&mut conn).unwrap();
        assert_eq!(outcome, Outcome::NoActionRequired { version: 5 });
        assert!(!outcome.is_change());
        assert_eq!(stored_version(&mut conn), Some(5));
    }

    #[test]
    fn test_second_initialize_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();
        migrator.initialize(&mut conn).unwrap();

        assert_eq!(
            migrator.initialize(&mut conn).unwrap(),
            Outcome::NoActionRequired { version: 1 }
        );
    }

    #[test]
    fn test_migrate_before_initialize() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = sqlite_migrator().migrate(&mut conn).unwrap_err();

        assert!(matches!(err, SchemaError::NotInitialized { ref table } if table == "schema_version"));
        assert!(!err.is_fatal());
        assert!(!table_exists(&conn, "users"));
    }

    #[test]
    fn test_newer_database_is_left_alone() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();
        migrator.initialize(&mut conn).unwrap();
        conn.execute_batch(r#"UPDATE "schema_version" SET "version" = 6"#)
            .unwrap();

        let err = migrator.migrate(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedDowngrade { stored: 6, target: 5 }
        ));
        assert_eq!(stored_version(&mut conn), Some(6));
        // still the version 1 users table
        assert!(!table_exists(&conn, "folders"));
    }

    #[test]
    fn test_user_rows_survive_and_are_normalized() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();
        migrator.initialize(&mut conn).unwrap();
        conn.execute_batch(
            r#"INSERT INTO "users" ("username", "password", "home_dir", "uid", "gid", "max_sessions",
                "quota_size", "quota_files", "permissions", "used_quota_size", "used_quota_files",
                "last_quota_update", "upload_bandwidth", "download_bandwidth", "expiration_date",
                "last_login", "status")
            VALUES ('alice', 'secret', '/home/alice', 1000, 1000, 0, 0, 0, '{"/":["*"]}', 0, 0, 0, 0, 0, 0, 0, 1)"#,
        )
        .unwrap();

        migrator.migrate(&mut conn).unwrap();

        let (username, home_dir, filesystem, filters): (String, String, String, String) = conn
            .query_row(
                r#"SELECT "username", "home_dir", "filesystem", "filters" FROM "users""#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(username, "alice");
        assert_eq!(home_dir, "/home/alice");
        assert_eq!(filesystem, r#"{"provider":0}"#);
        assert_eq!(filters, "{}");
    }

    #[test]
    fn test_custom_table_names() {
        let tables = TableNames {
            users: "sftp_users".to_string(),
            schema_version: "sftp_schema".to_string(),
            folders: "sftp_folders".to_string(),
            folders_mapping: "sftp_folders_mapping".to_string(),
        };
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(Dialect::Sqlite.scripts(), tables.clone()).unwrap();

        migrator.ensure_current(&mut conn).unwrap();

        for table in ["sftp_users", "sftp_schema", "sftp_folders", "sftp_folders_mapping"] {
            assert!(table_exists(&conn, table), "{}", table);
        }
        assert!(!table_exists(&conn, "users"));
        assert!(!table_exists(&conn, "new__sftp_users"));
        assert_eq!(
            migrator.schema_status(&mut conn).unwrap(),
            SchemaStatus {
                stored: Some(5),
                target: 5
            }
        );
    }

    #[test]
    fn test_ensure_current_on_fresh_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();

        assert_eq!(
            migrator.schema_status(&mut conn).unwrap(),
            SchemaStatus {
                stored: None,
                target: 5
            }
        );
        assert_eq!(
            migrator.ensure_current(&mut conn).unwrap(),
            Outcome::Migrated {
                from: 1,
                to: 5,
                steps: 4
            }
        );
        assert_eq!(
            migrator.ensure_current(&mut conn).unwrap(),
            Outcome::NoActionRequired { version: 5 }
        );
    }

    #[test]
    fn test_interrupt_stops_between_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        let interrupt = Arc::new(AtomicBool::new(false));
        let migrator = sqlite_migrator().with_interrupt(interrupt.clone());
        migrator.initialize(&mut conn).unwrap();

        interrupt.store(true, Ordering::Release);
        assert_eq!(
            migrator.migrate(&mut conn).unwrap(),
            Outcome::Interrupted {
                from: 1,
                reached: 1
            }
        );
        assert_eq!(stored_version(&mut conn), Some(1));

        interrupt.store(false, Ordering::Release);
        assert_eq!(
            migrator.migrate(&mut conn).unwrap(),
            Outcome::Migrated {
                from: 1,
                to: 5,
                steps: 4
            }
        );
    }

    // A dialect whose 2 -> 3 step breaks on its second statement.
    const BROKEN_MIGRATIONS: &[Migration] = &[
        Migration::new(1, &[r#"ALTER TABLE "{{users}}" ADD COLUMN "nickname" text NULL"#]),
        Migration::new(
            2,
            &[
                r#"ALTER TABLE "{{users}}" ADD COLUMN "email" text NULL"#,
                r#"ALTER TABLE "{{users}}" ADD COLUMN "email" text NULL"#,
                r#"CREATE TABLE "never_created" ("id" integer)"#,
            ],
        ),
    ];

    const BROKEN: SchemaScripts = SchemaScripts {
        dialect: Dialect::Sqlite,
        table_exists: r#"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{{schema_version}}'"#,
        base: &[
            r#"CREATE TABLE "{{users}}" ("id" integer NOT NULL PRIMARY KEY)"#,
            r#"CREATE TABLE "{{schema_version}}" ("id" integer NOT NULL PRIMARY KEY AUTOINCREMENT, "version" integer NOT NULL)"#,
        ],
        read_version: r#"SELECT COUNT(*), MAX("version") FROM "{{schema_version}}""#,
        seed_version: r#"INSERT INTO "{{schema_version}}" ("version") VALUES (1)"#,
        update_version: r#"UPDATE "{{schema_version}}" SET "version" = {{version}}"#,
        migrations: BROKEN_MIGRATIONS,
    };

    static BROKEN_SCRIPTS: SchemaScripts = BROKEN;

    #[test]
    fn test_failed_step_rolls_back_and_halts_the_chain() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&BROKEN_SCRIPTS, TableNames::default()).unwrap();
        migrator.initialize(&mut conn).unwrap();

        let err = migrator.migrate(&mut conn).unwrap_err();
        match &err {
            SchemaError::StepFailed {
                from, to, statement, ..
            } => {
                assert_eq!((*from, *to, *statement), (2, 3, 2));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_fatal());

        // 1 -> 2 committed, 2 -> 3 left no trace
        assert_eq!(stored_version(&mut conn), Some(2));
        assert_eq!(column_names(&conn, "users"), vec!["id", "nickname"]);
        assert!(!table_exists(&conn, "never_created"));
        assert!(matches!(
            migrator.progress().history().last(),
            Some(MigrationMessage::Failed { .. })
        ));
    }

    static BROKEN_BASE_SCRIPTS: SchemaScripts = SchemaScripts {
        base: &[
            r#"CREATE TABLE "{{users}}" ("id" integer NOT NULL PRIMARY KEY)"#,
            r#"CREATE TABLE "{{users}}" ("id" integer NOT NULL PRIMARY KEY)"#,
        ],
        ..BROKEN
    };

    #[test]
    fn test_failed_base_schema_leaves_database_uninitialized() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&BROKEN_BASE_SCRIPTS, TableNames::default()).unwrap();

        let err = migrator.initialize(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::StepFailed {
                from: 0,
                to: 1,
                statement: 2,
                ..
            }
        ));
        assert!(!table_exists(&conn, "users"));
        assert_eq!(stored_version(&mut conn), None);
    }

    #[test]
    fn test_unknown_version_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrator = sqlite_migrator();
        migrator.initialize(&mut conn).unwrap();
        conn.execute_batch(r#"UPDATE "schema_version" SET "version" = 0"#)
            .unwrap();

        assert!(matches!(
            migrator.migrate(&mut conn).unwrap_err(),
            SchemaError::UnknownVersion(0)
        ));
    }

    /// Records every statement instead of running it, tracking only the
    /// version row. Lets the engine be driven with any dialect's templates.
    #[derive(Default)]
    struct RecordingHandle {
        version: Option<i64>,
        transactions: usize,
        executed: Vec<String>,
    }

    struct RecordingTransaction<'a> {
        handle: &'a mut RecordingHandle,
        version: Option<i64>,
        executed: Vec<String>,
    }

    fn version_row(version: Option<i64>) -> Vec<Option<i64>> {
        match version {
            Some(v) => vec![Some(1), Some(v)],
            None => vec![Some(0), None],
        }
    }

    fn recorded_version(sql: &str, current: Option<i64>) -> Option<i64> {
        if sql.starts_with("INSERT INTO [schema_version]") {
            return Some(1);
        }
        match sql.strip_prefix("UPDATE [schema_version] SET [version] = ") {
            Some(v) => v.parse().ok(),
            None => current,
        }
    }

    impl SqlHandle for RecordingHandle {
        type Transaction<'a> = RecordingTransaction<'a>;

        fn query_integers(&mut self, sql: &str) -> Result<Vec<Option<i64>>, SchemaError> {
            if sql.contains("INFORMATION_SCHEMA.TABLES") {
                return Ok(vec![Some(self.version.is_some() as i64)]);
            }
            Ok(version_row(self.version))
        }

        fn begin(&mut self) -> Result<Self::Transaction<'_>, SchemaError> {
            self.transactions += 1;
            let version = self.version;
            Ok(RecordingTransaction {
                handle: self,
                version,
                executed: Vec::new(),
            })
        }
    }

    impl SqlTransaction for RecordingTransaction<'_> {
        fn execute(&mut self, sql: &str) -> Result<(), SchemaError> {
            self.version = recorded_version(sql, self.version);
            self.executed.push(sql.to_string());
            Ok(())
        }

        fn query_integers(&mut self, _sql: &str) -> Result<Vec<Option<i64>>, SchemaError> {
            Ok(version_row(self.version))
        }

        fn commit(self) -> Result<(), SchemaError> {
            self.handle.version = self.version;
            self.handle.executed.extend(self.executed);
            Ok(())
        }

        fn rollback(self) -> Result<(), SchemaError> {
            Ok(())
        }
    }

    fn mssql_migrator() -> Migrator {
        Migrator::new(Dialect::Mssql.scripts(), TableNames::default()).unwrap()
    }

    #[test]
    fn test_mssql_statements_are_fully_rendered() {
        let mut handle = RecordingHandle::default();
        let migrator = mssql_migrator();

        migrator.ensure_current(&mut handle).unwrap();

        assert_eq!(handle.version, Some(5));
        assert_eq!(handle.transactions, 5);
        assert!(!handle.executed.is_empty());
        for sql in &handle.executed {
            assert!(!sql.contains("{{"), "{}", sql);
        }
        assert_eq!(handle.executed.first().map(|s| s.starts_with("CREATE TABLE [users]")), Some(true));
        assert_eq!(
            handle.executed.last().map(String::as_str),
            Some("UPDATE [schema_version] SET [version] = 5")
        );
    }

    #[test]
    fn test_up_to_date_database_executes_nothing() {
        let mut handle = RecordingHandle {
            version: Some(5),
            ..Default::default()
        };

        let outcome = mssql_migrator().migrate(&mut handle).unwrap();
        assert_eq!(outcome, Outcome::NoActionRequired { version: 5 });
        assert_eq!(handle.transactions, 0);
        assert!(handle.executed.is_empty());
    }

    #[test]
    fn test_newer_database_executes_nothing() {
        let mut handle = RecordingHandle {
            version: Some(6),
            ..Default::default()
        };

        let err = mssql_migrator().migrate(&mut handle).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedDowngrade { stored: 6, target: 5 }
        ));
        assert_eq!(handle.transactions, 0);
        assert!(handle.executed.is_empty());
        assert_eq!(handle.version, Some(6));
    }
}
