//! Database access for FXLens.
//!
//! Queries run against a PostgreSQL database holding the `forex_bars` table.
//! The [`DatabaseClient`] trait lets the dashboard run against a real pool or
//! the in-memory mock used for demos and tests.

mod mock;
mod params;
mod postgres;
mod types;

pub use mock::{ExecutedQuery, FailingDatabaseClient, MockDatabaseClient};
pub use params::{
    apply_limit, bind_named, BoundQuery, ParamValue, QueryParams, MIN_DAILY_RANGE,
    MIN_GAP_RANGE, THRESHOLD_RANGE,
};
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Rows returned per query before truncation.
pub const MAX_ROWS: usize = 1000;

/// Prepares a PostgreSQL client that connects on its first query.
pub fn connect_lazy(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect_lazy(config)?;
    Ok(Box::new(client))
}

/// Interface to the forex database.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a read query with positional `$n` placeholders bound to `params`.
    async fn execute_query(&self, sql: &str, params: &[ParamValue]) -> Result<QueryResult>;

    /// Checks that the database is reachable.
    async fn ping(&self) -> Result<()>;

    /// Releases the underlying connections.
    async fn close(&self) -> Result<()>;
}
