//! The seam concrete SQL Server/MySQL/PostgreSQL drivers implement
//! (§6 "External Interfaces"). This crate only owns the trait, the
//! transient-error classification, and the retry loop built on top of it
//! (§4.C8 phase 3, §4.C9 phase 4) — every phase downstream operates on
//! `reef_types::Row`/`ColumnValue` so it is testable against a stub
//! [`DbClient`] without a live driver.

use std::time::Duration;

use reef_types::{ConnectionKind, Row};

/// One query or statement execution against a source/target connection.
/// Implementations are expected to set `ApplicationName="Reef"` and a
/// 30s command timeout per connection (§6).
pub trait DbClient: Send + Sync {
    fn query(&self, connection_string: &str, sql: &str) -> Result<Vec<Row>, DbError>;
    fn execute(&self, connection_string: &str, sql: &str) -> Result<u64, DbError>;
    /// Best-effort column name/type probe for the import pipeline's
    /// "Schema probe" phase (§4.C9 phase 5). Errors here are non-fatal;
    /// callers fall back to the configured column mappings.
    fn probe_schema(&self, connection_string: &str, table: &str) -> Result<Vec<String>, DbError>;

    /// Run `statements` as a single all-or-nothing unit (§4.C9 phase 8
    /// `rollback_on_abort`). The default executes them one at a time with
    /// no atomicity guarantee at all, since plain `execute` calls can't
    /// provide one; a concrete driver should override this with a real
    /// `BEGIN`/`COMMIT`/`ROLLBACK` transaction.
    fn execute_transaction(&self, connection_string: &str, statements: &[String]) -> Result<u64, DbError> {
        let mut total = 0;
        for sql in statements {
            total += self.execute(connection_string, sql)?;
        }
        Ok(total)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error (code {code:?}): {message}")]
    Query {
        kind: ConnectionKind,
        code: Option<i64>,
        sqlstate: Option<String>,
        message: String,
    },
    #[error("connection failed: {0}")]
    Connection(String),
}

impl DbError {
    /// §4.C8 phase 3: the transient-code allow-list is driver-specific.
    /// SQL Server and MySQL classify by numeric error code; PostgreSQL
    /// classifies by SQLSTATE.
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::Connection(_) => true,
            DbError::Query {
                kind,
                code,
                sqlstate,
                ..
            } => match kind {
                ConnectionKind::SqlServer => code
                    .map(|c| matches!(c, -2 | 1205 | 1204 | 40197 | 40501 | 40613 | 49918 | 49919 | 49920))
                    .unwrap_or(false),
                ConnectionKind::MySql => code.map(|c| matches!(c, 1205 | 1213 | 2006 | 2013)).unwrap_or(false),
                ConnectionKind::PostgreSql => sqlstate
                    .as_deref()
                    .map(|s| matches!(s, "40001" | "40P01" | "53300" | "57P03"))
                    .unwrap_or(false),
            },
        }
    }
}

/// §4.C8 phase 3's documented backoff: `2 * (attempt + 1)` seconds,
/// `attempt` zero-indexed.
pub fn query_retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(2 * (attempt as u64 + 1))
}

/// Run `query` against `client`, retrying transient failures up to
/// `max_retries` additional times with the §4.C8 backoff. `max_retries`
/// counts retries, not attempts: `max_retries = 2` means up to 3 tries.
pub fn query_with_retry(
    client: &dyn DbClient,
    connection_string: &str,
    sql: &str,
    max_retries: u32,
    sleep: impl Fn(Duration),
) -> Result<Vec<Row>, DbError> {
    let mut attempt = 0;
    loop {
        match client.query(connection_string, sql) {
            Ok(rows) => return Ok(rows),
            Err(e) if e.is_transient() && attempt < max_retries => {
                sleep(query_retry_delay(attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Same retry rule as [`query_with_retry`], for statements executed with
/// [`DbClient::execute`] (§4.C9 "Load" phase).
pub fn execute_with_retry(
    client: &dyn DbClient,
    connection_string: &str,
    sql: &str,
    max_retries: u32,
    sleep: impl Fn(Duration),
) -> Result<u64, DbError> {
    let mut attempt = 0;
    loop {
        match client.execute(connection_string, sql) {
            Ok(affected) => return Ok(affected),
            Err(e) if e.is_transient() && attempt < max_retries => {
                sleep(query_retry_delay(attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Same retry rule as [`execute_with_retry`], retrying the whole batch as
/// one unit through [`DbClient::execute_transaction`].
pub fn execute_transaction_with_retry(
    client: &dyn DbClient,
    connection_string: &str,
    statements: &[String],
    max_retries: u32,
    sleep: impl Fn(Duration),
) -> Result<u64, DbError> {
    let mut attempt = 0;
    loop {
        match client.execute_transaction(connection_string, statements) {
            Ok(affected) => return Ok(affected),
            Err(e) if e.is_transient() && attempt < max_retries => {
                sleep(query_retry_delay(attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::sync::Mutex;

    /// A scripted [`DbClient`] for pipeline tests: returns the next
    /// queued result for each call to `query`, regardless of the SQL
    /// text, and records every statement it was asked to run.
    pub struct StubDbClient {
        pub responses: Mutex<Vec<Result<Vec<Row>, DbError>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubDbClient {
        pub fn new(responses: Vec<Result<Vec<Row>, DbError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DbClient for StubDbClient {
        fn query(&self, _connection_string: &str, sql: &str) -> Result<Vec<Row>, DbError> {
            self.calls.lock().unwrap().push(sql.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(Vec::new());
            }
            responses.remove(0)
        }

        fn execute(&self, _connection_string: &str, sql: &str) -> Result<u64, DbError> {
            self.calls.lock().unwrap().push(sql.to_string());
            Ok(0)
        }

        fn probe_schema(&self, _connection_string: &str, _table: &str) -> Result<Vec<String>, DbError> {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn sql_server_deadlock_victim_is_transient() {
        let err = DbError::Query {
            kind: ConnectionKind::SqlServer,
            code: Some(1205),
            sqlstate: None,
            message: "deadlock".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn mysql_unknown_code_is_not_transient() {
        let err = DbError::Query {
            kind: ConnectionKind::MySql,
            code: Some(1062),
            sqlstate: None,
            message: "duplicate key".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn postgres_classifies_by_sqlstate() {
        let err = DbError::Query {
            kind: ConnectionKind::PostgreSql,
            code: None,
            sqlstate: Some("40P01".to_string()),
            message: "deadlock detected".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn retry_delay_doubles_the_attempt_index_plus_one() {
        assert_eq!(query_retry_delay(0), Duration::from_secs(2));
        assert_eq!(query_retry_delay(1), Duration::from_secs(4));
        assert_eq!(query_retry_delay(2), Duration::from_secs(6));
    }

    #[test]
    fn query_with_retry_gives_up_after_max_retries() {
        let client = stub::StubDbClient::new(vec![
            Err(DbError::Connection("reset".into())),
            Err(DbError::Connection("reset".into())),
            Err(DbError::Connection("reset".into())),
        ]);
        let slept = Mutex::new(Vec::new());
        let result = query_with_retry(&client, "cs", "select 1", 1, |d| slept.lock().unwrap().push(d));
        assert!(result.is_err());
        assert_eq!(slept.into_inner().unwrap().len(), 1);
    }

    /// A client whose default `execute_transaction` counts how many
    /// statements it actually ran before failing partway through, proving
    /// the default (non-atomic) behavior an overriding driver must improve
    /// on.
    struct CountingClient {
        executed: Mutex<u32>,
        fail_on: u32,
    }

    impl DbClient for CountingClient {
        fn query(&self, _connection_string: &str, _sql: &str) -> Result<Vec<Row>, DbError> {
            Ok(Vec::new())
        }

        fn execute(&self, _connection_string: &str, _sql: &str) -> Result<u64, DbError> {
            let mut executed = self.executed.lock().unwrap();
            *executed += 1;
            if *executed == self.fail_on {
                return Err(DbError::Connection("reset".into()));
            }
            Ok(1)
        }

        fn probe_schema(&self, _connection_string: &str, _table: &str) -> Result<Vec<String>, DbError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn default_execute_transaction_runs_statements_one_at_a_time_with_no_rollback() {
        let client = CountingClient { executed: Mutex::new(0), fail_on: 2 };
        let statements = vec!["delete from t".to_string(), "insert into t values (1)".to_string()];
        let result = client.execute_transaction("cs", &statements);
        assert!(result.is_err());
        assert_eq!(*client.executed.lock().unwrap(), 2);
    }

    #[test]
    fn execute_transaction_with_retry_retries_the_whole_batch() {
        let client = CountingClient { executed: Mutex::new(0), fail_on: 2 };
        let statements = vec!["delete from t".to_string(), "insert into t values (1)".to_string()];
        let slept = Mutex::new(Vec::new());
        let result =
            execute_transaction_with_retry(&client, "cs", &statements, 1, |d| slept.lock().unwrap().push(d));
        assert!(result.is_ok());
        assert_eq!(slept.into_inner().unwrap().len(), 1);
    }
}
