//! PostgreSQL execution tests. Skipped unless `DATABASE_URL` is set.

use chrono::NaiveDate;
use fxlens::config::ConnectionConfig;
use fxlens::db::{bind_named, DatabaseClient, ParamValue, PostgresClient, QueryParams, Value};

fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

async fn get_test_client() -> Option<PostgresClient> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&config).await.ok()
}

fn params() -> QueryParams {
    QueryParams {
        start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        threshold_pips: 50,
        min_gap_pips: 5,
        min_daily_pips: 20,
    }
}

/// Inline bars so the tests need no fixture table.
const BARS: &str = r#"
WITH forex_bars ("datetime", open, high, low, close, pip_hl) AS (
    VALUES
        (TIMESTAMP '2025-03-03 08:00:00', 1.0800::float8, 1.0850::float8, 1.0790::float8, 1.0840::float8, 60.0::float8),
        (TIMESTAMP '2025-03-03 09:00:00', 1.0840, 1.0860, 1.0830, 1.0835, 30.0),
        (TIMESTAMP '2025-03-05 09:00:00', 1.0900, 1.0990, 1.0890, 1.0950, 100.0)
)
"#;

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 AS num, 'eurusd' AS symbol", &[])
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["num", "symbol"]);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::String("eurusd".to_string()));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_named_parameters_bind_dates_and_pips() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql = format!(
        "{BARS} SELECT \"datetime\", pip_hl FROM forex_bars \
         WHERE \"datetime\"::date BETWEEN :start_date AND :end_date \
           AND pip_hl >= :threshold_pips ORDER BY \"datetime\""
    );
    let bound = bind_named(&sql, &params()).unwrap();
    assert_eq!(bound.values.len(), 3);
    assert!(matches!(bound.values[0], ParamValue::Date(_)));

    let result = client.execute_query(&bound.sql, &bound.values).await.unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::String("2025-03-03 08:00:00".to_string()));
    assert_eq!(result.rows[0][1], Value::Float(60.0));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_null_and_date_values() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT NULL::float8 AS gap, DATE '2025-03-07' AS trade_date", &[])
        .await
        .unwrap();
    assert!(result.rows[0][0].is_null());
    assert_eq!(result.rows[0][1], Value::String("2025-03-07".to_string()));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client
        .execute_query("SELECT * FROM forex_bars_that_do_not_exist", &[])
        .await
        .unwrap_err();
    assert!(
        err.to_string().to_lowercase().contains("does not exist"),
        "unexpected error: {err}"
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_ping() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client.ping().await.unwrap();
    client.close().await.unwrap();
}
