// crates/control-check-tools/src/db.rs
// ============================================================================
// Module: Data Query Tool
// Description: Read-only SQL query against a MySQL/MariaDB server.
// Purpose: Capture column names and rows as query evidence.
// Dependencies: control-check-core, serde, sqlx, tokio
// ============================================================================

//! ## Overview
//! In dry-run mode the tool returns empty columns and rows with a fixed note
//! and never opens a connection. In live mode it opens a single connection,
//! starts a `READ ONLY` transaction, runs the statement under a deadline,
//! keeps at most `max_rows` rows, rolls back, and closes the connection.
//! Column names are recorded even when the result set is empty. The password
//! is read from the configured environment variable; an unset variable is a
//! configuration error.
//! The statement is sent over the text protocol so administrative statements
//! such as `SHOW VARIABLES` work as well as `SELECT`.
//!
//! The tool is synchronous; each live invocation drives its own
//! current-thread tokio runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use control_check_core::QueryObservation;
use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use control_check_core::ToolPayload;
use serde::Deserialize;
use serde_json::Number;
use serde_json::Value;
use sqlx::Column;
use sqlx::ConnectOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::Row;
use sqlx::Statement;
use sqlx::ValueRef;
use sqlx::mysql::MySqlColumn;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::mysql::MySqlConnection;
use sqlx::mysql::MySqlRow;
use tokio::time::timeout;

use crate::registry::required_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed note returned in dry-run mode.
pub const DRY_RUN_NOTE: &str = "DRY_RUN: no DB connection";
/// Upper bound for the connect timeout.
pub const MAX_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Deadline for the rollback and close sequence.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the data query tool.
///
/// # Invariants
/// - The password is never stored in configuration; it is read from the
///   environment variable named by `password_env` at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataQueryConfig {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database user.
    #[serde(default = "default_user")]
    pub user: String,
    /// Environment variable holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Optional default schema.
    #[serde(default)]
    pub database: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Query deadline in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Maximum rows kept in the observation.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for DataQueryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password_env: default_password_env(),
            database: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            max_rows: default_max_rows(),
        }
    }
}

/// Default for `host`.
fn default_host() -> String {
    "localhost".to_string()
}

/// Default for `port`.
const fn default_port() -> u16 {
    3306
}

/// Default for `user`.
fn default_user() -> String {
    "readonly".to_string()
}

/// Default for `password_env`.
fn default_password_env() -> String {
    "CONTROL_CHECK_DB_PASSWORD".to_string()
}

/// Default for `connect_timeout_ms`.
const fn default_connect_timeout_ms() -> u64 {
    MAX_CONNECT_TIMEOUT_MS
}

/// Default for `query_timeout_ms`.
const fn default_query_timeout_ms() -> u64 {
    30_000
}

/// Default for `max_rows`.
const fn default_max_rows() -> usize {
    1_000
}

// ============================================================================
// SECTION: Tool Implementation
// ============================================================================

/// Read-only SQL query tool.
pub struct DataQueryTool {
    /// Connection settings.
    config: DataQueryConfig,
    /// Simulate instead of connecting.
    dry_run: bool,
}

impl DataQueryTool {
    /// Creates the tool.
    #[must_use]
    pub const fn new(config: DataQueryConfig, dry_run: bool) -> Self {
        Self {
            config,
            dry_run,
        }
    }

    /// Builds connection options from configuration and environment.
    ///
    /// An unset password variable is a configuration error; a variable set
    /// to the empty string is sent as an empty password.
    fn connect_options(&self) -> Result<MySqlConnectOptions, ToolError> {
        let password = std::env::var(&self.config.password_env).map_err(|_| {
            ToolError::Configuration(format!("{} is not set", self.config.password_env))
        })?;
        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&password);
        Ok(match &self.config.database {
            Some(database) => options.database(database),
            None => options,
        })
    }

    /// Runs the statement against the live server.
    fn run_live(&self, sql: &str) -> Result<QueryObservation, ToolError> {
        let options = self.connect_options()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ToolError::Configuration(format!("query runtime: {err}")))?;
        runtime.block_on(self.run_async(options, sql))
    }

    /// Opens the connection, runs the query, and always closes.
    async fn run_async(
        &self,
        options: MySqlConnectOptions,
        sql: &str,
    ) -> Result<QueryObservation, ToolError> {
        let connect_timeout =
            Duration::from_millis(self.config.connect_timeout_ms.min(MAX_CONNECT_TIMEOUT_MS));
        let mut conn = timeout(connect_timeout, options.connect())
            .await
            .map_err(|_| {
                ToolError::Timeout(format!(
                    "database connect to {}:{}",
                    self.config.host, self.config.port
                ))
            })?
            .map_err(|err| ToolError::Connection(format!("database connect: {err}")))?;

        let outcome = self.read_only_query(&mut conn, sql).await;
        let _ = timeout(CLOSE_TIMEOUT, conn.close()).await;
        outcome
    }

    /// Runs `sql` inside a read-only transaction that is rolled back.
    async fn read_only_query(
        &self,
        conn: &mut MySqlConnection,
        sql: &str,
    ) -> Result<QueryObservation, ToolError> {
        (&mut *conn)
            .execute("START TRANSACTION READ ONLY")
            .await
            .map_err(classify_error)?;
        let deadline = Duration::from_millis(self.config.query_timeout_ms);
        let fetched = timeout(deadline, fetch_result_set(conn, sql)).await.map_err(|_| {
            ToolError::Timeout(format!("query exceeded {} ms", self.config.query_timeout_ms))
        });
        let _ = timeout(CLOSE_TIMEOUT, (&mut *conn).execute("ROLLBACK")).await;
        let (columns, rows) = fetched??;
        tracing::debug!(columns = columns.len(), rows = rows.len(), "data query completed");
        Ok(observation(sql, columns, rows, self.config.max_rows))
    }
}

/// Runs `sql` and returns its column names and rows as JSON values.
///
/// Column names come from the result rows when there are any. An empty
/// result set takes them from the prepared statement's metadata; statements
/// the server cannot prepare then report no columns.
async fn fetch_result_set(
    conn: &mut MySqlConnection,
    sql: &str,
) -> Result<(Vec<String>, Vec<Vec<Value>>), ToolError> {
    let rows = (&mut *conn).fetch_all(sql).await.map_err(classify_error)?;
    let columns = match rows.first() {
        Some(row) => column_names(row.columns()),
        None => match (&mut *conn).prepare(sql).await {
            Ok(statement) => column_names(statement.columns()),
            Err(err) => {
                tracing::debug!(error = %err, "column metadata unavailable");
                Vec::new()
            }
        },
    };
    let values = rows.iter().map(row_values).collect();
    Ok((columns, values))
}

impl Tool for DataQueryTool {
    fn invoke(&self, args: &ToolArgs) -> Result<ToolPayload, ToolError> {
        let sql = required_str(args, "sql")?;
        if self.dry_run {
            return Ok(ToolPayload::QueryRows(QueryObservation {
                query: sql.to_string(),
                columns: Vec::new(),
                rows: Vec::new(),
                note: Some(DRY_RUN_NOTE.to_string()),
                simulated: true,
            }));
        }
        self.run_live(sql).map(ToolPayload::QueryRows)
    }
}

// ============================================================================
// SECTION: Row Conversion
// ============================================================================

/// Builds the observation, keeping at most `max_rows` rows.
fn observation(
    sql: &str,
    columns: Vec<String>,
    mut rows: Vec<Vec<Value>>,
    max_rows: usize,
) -> QueryObservation {
    let total = rows.len();
    rows.truncate(max_rows);
    let note = (total > max_rows).then(|| format!("truncated to {max_rows} of {total} rows"));
    QueryObservation {
        query: sql.to_string(),
        columns,
        rows,
        note,
        simulated: false,
    }
}

/// Returns the names of result columns in order.
fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
    columns.iter().map(|column| column.name().to_string()).collect()
}

/// Converts every cell of a row to JSON.
fn row_values(row: &MySqlRow) -> Vec<Value> {
    (0..row.columns().len()).map(|index| column_value(row, index)).collect()
}

/// Converts one cell to JSON, preferring numeric types.
fn column_value(row: &MySqlRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Value::from(value);
    }
    if let Ok(value) = row.try_get::<u64, _>(index) {
        return Value::from(value);
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return Number::from_f64(value).map_or(Value::Null, Value::Number);
    }
    if let Ok(value) = row.try_get_unchecked::<String, _>(index) {
        return Value::String(value);
    }
    if let Ok(value) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        return Value::String(String::from_utf8_lossy(&value).into_owned());
    }
    Value::Null
}

/// Maps driver errors onto tool error kinds.
fn classify_error(err: sqlx::Error) -> ToolError {
    match err {
        sqlx::Error::Io(err) => ToolError::Connection(format!("database io: {err}")),
        sqlx::Error::Tls(err) => ToolError::Connection(format!("database tls: {err}")),
        sqlx::Error::Database(err) => ToolError::Execution(format!("database: {}", err.message())),
        other => ToolError::Execution(format!("database: {other}")),
    }
}

#[cfg(test)]
mod tests;
