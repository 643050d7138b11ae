mod mssql;
mod mysql;
mod postgresql;
mod sqlite;
mod template;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::SchemaError;

pub use template::{render, render_all, TableNames, TableRole};

/// Token for the version number in `SchemaScripts::update_version`.
pub const VERSION_TOKEN: &str = "{{version}}";

/// The version every freshly initialized database starts at.
pub const BASE_VERSION: i64 = 1;

#[derive(AsRefStr, EnumIter, EnumString, Display, Debug, PartialEq, Eq, Copy, Clone)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dialect {
    Sqlite,
    Mssql,
    Postgresql,
    Mysql,
}

impl Dialect {
    /// The compiled-in statement set for this dialect.
    pub fn scripts(self) -> &'static SchemaScripts {
        match self {
            Dialect::Sqlite => &sqlite::SCRIPTS,
            Dialect::Mssql => &mssql::SCRIPTS,
            Dialect::Postgresql => &postgresql::SCRIPTS,
            Dialect::Mysql => &mysql::SCRIPTS,
        }
    }
}

/// One upgrade step, from `from` to `from + 1`.
///
/// Statements run in declared order inside a single transaction.
#[derive(Debug)]
pub struct Migration {
    pub from: i64,
    pub statements: &'static [&'static str],
}

impl Migration {
    pub const fn new(from: i64, statements: &'static [&'static str]) -> Self {
        Self { from, statements }
    }

    pub const fn to(&self) -> i64 {
        self.from + 1
    }
}

/// Every statement template a dialect needs: base schema, version table
/// access and the upgrade chain.
#[derive(Debug)]
pub struct SchemaScripts {
    pub dialect: Dialect,
    /// Single row, single column count of version tables with the configured name.
    pub table_exists: &'static str,
    /// Base schema, including the version table itself.
    pub base: &'static [&'static str],
    /// Single row: row count and highest version.
    pub read_version: &'static str,
    pub seed_version: &'static str,
    pub update_version: &'static str,
    pub migrations: &'static [Migration],
}

impl SchemaScripts {
    /// The version reached once every registered migration has been applied.
    pub fn target_version(&self) -> i64 {
        self.migrations
            .last()
            .map(Migration::to)
            .unwrap_or(BASE_VERSION)
    }

    /// Checks that the migrations form a gap-free chain starting at the
    /// base version and that none of them is empty.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut expected = BASE_VERSION;
        for migration in self.migrations {
            if migration.from != expected {
                return Err(SchemaError::InvalidStepTable(format!(
                    "{}: expected a migration from version {}, found one from {}",
                    self.dialect, expected, migration.from
                )));
            }
            if migration.statements.is_empty() {
                return Err(SchemaError::InvalidStepTable(format!(
                    "{}: migration {} -> {} has no statements",
                    self.dialect,
                    migration.from,
                    migration.to()
                )));
            }
            expected = migration.to();
        }

        if self.base.is_empty() {
            return Err(SchemaError::InvalidStepTable(format!(
                "{}: base schema has no statements",
                self.dialect
            )));
        }

        Ok(())
    }

    /// All templates, in no particular order.
    pub fn templates(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            self.table_exists,
            self.read_version,
            self.seed_version,
            self.update_version,
        ]
        .into_iter()
        .chain(self.base.iter().copied())
        .chain(self.migrations.iter().flat_map(|m| m.statements.iter().copied()))
    }
}
