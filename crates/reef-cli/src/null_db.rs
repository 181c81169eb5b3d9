use reef_pipeline::{DbClient, DbError};
use reef_types::Row;

/// Concrete SQL Server/MySQL/PostgreSQL drivers are outside this crate's
/// scope (§6); this stand-in lets the CLI wire a full scheduler/pipeline
/// without one, failing clearly instead of silently no-opping.
pub struct NullDbClient;

impl DbClient for NullDbClient {
    fn query(&self, _connection_string: &str, _sql: &str) -> Result<Vec<Row>, DbError> {
        Err(DbError::Connection("no database driver configured".into()))
    }

    fn execute(&self, _connection_string: &str, _sql: &str) -> Result<u64, DbError> {
        Err(DbError::Connection("no database driver configured".into()))
    }

    fn probe_schema(&self, _connection_string: &str, _table: &str) -> Result<Vec<String>, DbError> {
        Err(DbError::Connection("no database driver configured".into()))
    }
}
