//! PostgreSQL client built on a sqlx pool.

use super::{ColumnInfo, DatabaseClient, ParamValue, QueryResult, Row, Value, MAX_ROWS};
use crate::config::ConnectionConfig;
use crate::error::{FxLensError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Postgres, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const QUERY_TIMEOUT_SECS: u64 = 30;

const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Doubles after every failed attempt.
const RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    config: ConnectionConfig,
}

impl PostgresClient {
    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
    }

    /// Creates a pool that connects on first use.
    ///
    /// Only a malformed connection string fails here. An unreachable server
    /// surfaces as a connection error from the first query or ping.
    pub fn connect_lazy(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let pool = Self::pool_options()
            .connect_lazy(&conn_str)
            .map_err(|e| map_connection_error(e, config))?;
        debug!("Created lazy pool for {}", config.display_string());
        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Opens a pool, retrying transient failures with exponential backoff.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;
        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = Self::pool_options().connect(&conn_str).await;

            match result {
                Ok(pool) => {
                    info!("Connected to {}", config.display_string());
                    return Ok(Self {
                        pool,
                        config: config.clone(),
                    });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(map_connection_error(e, config)),
            }
        }
    }
}

impl PostgresClient {
    /// Server errors keep their Postgres detail; failures to reach the server
    /// become connection errors.
    fn map_query_error(&self, error: sqlx::Error) -> FxLensError {
        if error.as_database_error().is_some() {
            FxLensError::query(format_query_error(error))
        } else if is_unreachable(&error) {
            map_connection_error(error, &self.config)
        } else {
            FxLensError::query(error.to_string())
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str, params: &[ParamValue]) -> Result<QueryResult> {
        let start = Instant::now();
        debug!("Executing query with {} parameters", params.len());

        let query = params.iter().fold(sqlx::query(sql), bind_param);

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            query.fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            FxLensError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| self.map_query_error(e))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        if total_rows > MAX_ROWS {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().map(convert_row).collect();
        Ok(QueryResult::with_data(columns, rows)
            .with_execution_time(execution_time)
            .truncate(MAX_ROWS))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_connection_error(e, &self.config))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &ParamValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        ParamValue::Date(d) => query.bind(*d),
        ParamValue::Int(i) => query.bind(*i),
        ParamValue::Float(f) => query.bind(*f),
        ParamValue::Text(s) => query.bind(s.clone()),
    }
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell by its Postgres type name. Undecodable cells become NULL.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(index).ok().flatten()
    }

    match type_name.to_uppercase().as_str() {
        "BOOL" => get::<bool>(row, index).map(Value::Bool),
        "INT2" => get::<i16>(row, index).map(|v| Value::Int(v.into())),
        "INT4" => get::<i32>(row, index).map(|v| Value::Int(v.into())),
        "INT8" => get::<i64>(row, index).map(Value::Int),
        "FLOAT4" => get::<f32>(row, index).map(|v| Value::Float(v.into())),
        "FLOAT8" => get::<f64>(row, index).map(Value::Float),
        "DATE" => get::<NaiveDate>(row, index).map(|d| Value::String(d.to_string())),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)
            .map(|ts| Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)
            .map(|ts| Value::String(ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())),
        // NUMERIC does not decode as text; curated SQL casts it to float8.
        _ => get::<String>(row, index).map(Value::String),
    }
    .unwrap_or(Value::Null)
}

/// True when the pool could not reach or authenticate to the server.
fn is_unreachable(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
    ) || is_transient_error(error)
}

fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("password authentication failed")
        || error_str.contains("does not exist")
        || error_str.contains("ssl")
        || error_str.contains("tls")
    {
        return false;
    }

    matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        || error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
}

/// Turns a sqlx connection failure into a message a dashboard user can act on.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> FxLensError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        FxLensError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("authentication failed") {
        FxLensError::connection(format!(
            "Authentication failed for user '{user}'. Check DB_USER and DB_PASSWORD."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        FxLensError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        FxLensError::connection(
            "Server requires SSL. Add '?sslmode=require' to the connection URL.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        FxLensError::connection(format!("Connection to {host}:{port} timed out."))
    } else {
        FxLensError::connection(error.to_string())
    }
}

/// Formats a database error with the Postgres detail and hint lines.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());
    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }
    result
}
