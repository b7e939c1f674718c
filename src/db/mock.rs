//! In-memory database clients for demos and tests.

use super::{ColumnInfo, DatabaseClient, ParamValue, QueryResult, Row, Value, MAX_ROWS};
use crate::error::{FxLensError, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::sync::Mutex;
use std::time::Duration;

/// Number of hourly bars in the sample data set.
const SAMPLE_BARS: usize = 120;

/// A query the mock has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub params: Vec<ParamValue>,
}

/// A database that answers from canned data.
///
/// Queries containing a registered pattern get the matching canned result or
/// error. Anything else returns a deterministic set of hourly EUR/USD bars.
pub struct MockDatabaseClient {
    responses: Vec<(String, std::result::Result<QueryResult, String>)>,
    executed: Mutex<Vec<ExecutedQuery>>,
}

impl MockDatabaseClient {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns `result` for any query containing `pattern` (case-insensitive).
    pub fn with_response(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.responses
            .push((pattern.into().to_lowercase(), Ok(result)));
        self
    }

    /// Fails any query containing `pattern` (case-insensitive) with `message`.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .push((pattern.into().to_lowercase(), Err(message.into())));
        self
    }

    /// Queries executed so far, oldest first.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.executed
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    /// The sample bar set returned for unmatched queries.
    pub fn sample_bars() -> QueryResult {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);

        let rows: Vec<Row> = (0..SAMPLE_BARS)
            .map(|i| {
                let t = i as f64;
                let open = 1.0800 + 0.0040 * (t * 0.21).sin() + 0.0012 * (t * 1.7).cos();
                let close = 1.0800 + 0.0040 * ((t + 1.0) * 0.21).sin()
                    + 0.0012 * ((t + 1.0) * 1.7).cos();
                let wick = 0.0004 + 0.0003 * (t * 0.9).sin().abs();
                let high = open.max(close) + wick;
                let low = open.min(close) - wick;
                let timestamp = start + ChronoDuration::hours(i as i64);
                vec![
                    Value::from("EURUSD"),
                    Value::from(timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
                    Value::Float(round5(open)),
                    Value::Float(round5(high)),
                    Value::Float(round5(low)),
                    Value::Float(round5(close)),
                    Value::Float(round1((high - low) * 10_000.0)),
                    Value::Float(round1((close - open) * 10_000.0)),
                ]
            })
            .collect();

        QueryResult::with_data(
            vec![
                ColumnInfo::new("symbol", "TEXT"),
                ColumnInfo::new("datetime", "TIMESTAMP"),
                ColumnInfo::new("open", "FLOAT8"),
                ColumnInfo::new("high", "FLOAT8"),
                ColumnInfo::new("low", "FLOAT8"),
                ColumnInfo::new("close", "FLOAT8"),
                ColumnInfo::new("pip_hl", "FLOAT8"),
                ColumnInfo::new("pip_oc", "FLOAT8"),
            ],
            rows,
        )
    }
}

fn round5(v: f64) -> f64 {
    (v * 100_000.0).round() / 100_000.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str, params: &[ParamValue]) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(ExecutedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }

        let sql_lower = sql.to_lowercase();
        let canned = self
            .responses
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()));

        let result = match canned {
            Some((_, Ok(result))) => result.clone(),
            Some((_, Err(message))) => return Err(FxLensError::query(message.clone())),
            None => Self::sample_bars(),
        };

        Ok(result
            .with_execution_time(Duration::from_millis(1))
            .truncate(MAX_ROWS))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database that is never reachable.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, _sql: &str, _params: &[ParamValue]) -> Result<QueryResult> {
        Err(FxLensError::query(self.message.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Err(FxLensError::connection(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
