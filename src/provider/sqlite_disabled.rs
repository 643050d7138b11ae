use super::Provider;
use crate::config::Config;
use crate::db::migration::MigrationProgress;
use crate::error::SchemaError;
use crate::schema::Dialect;

pub fn open(_config: &Config, _progress: MigrationProgress) -> Result<Box<dyn Provider>, SchemaError> {
    Err(SchemaError::BackendUnavailable(Dialect::Sqlite))
}
