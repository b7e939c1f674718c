//! End-to-end question answering over the shipped curated queries, an
//! in-memory database and a CSV log in a temporary directory.

use chrono::NaiveDate;
use fxlens::app::{Answer, Dashboard, FALLBACK_MESSAGE};
use fxlens::db::{FailingDatabaseClient, MockDatabaseClient, QueryParams, MAX_ROWS};
use fxlens::llm::{Atlas, MockLlmClient};
use fxlens::persistence::UnansweredLog;
use fxlens::registry::{CuratedStore, MatchKind};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn shipped_store() -> CuratedStore {
    CuratedStore::load_dir(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("queries")).unwrap()
}

fn params() -> QueryParams {
    QueryParams {
        start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
        threshold_pips: 40,
        min_gap_pips: 5,
        min_daily_pips: 30,
    }
}

fn dashboard(log_path: &Path) -> Dashboard {
    Dashboard::new(
        shipped_store(),
        Box::new(MockDatabaseClient::new()),
        UnansweredLog::new(log_path),
    )
}

#[tokio::test]
async fn test_every_curated_query_runs() {
    let dir = tempdir().unwrap();
    let dashboard = dashboard(&dir.path().join("unanswered.csv"));

    for query in dashboard.store().queries() {
        let answer = dashboard
            .run_curated(query, MatchKind::Exact, &params(), None)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {e}", query.id));
        assert!(!answer.sql.contains(":start_date"), "{} left a placeholder", query.id);
        assert!(answer.result.row_count <= MAX_ROWS);
    }
}

#[tokio::test]
async fn test_example_question_is_a_hit() {
    let dir = tempdir().unwrap();
    let dashboard = dashboard(&dir.path().join("unanswered.csv"));

    let answer = dashboard
        .ask(
            "What was the highest EUR/USD pip movement last week?",
            &params(),
            None,
        )
        .await
        .unwrap();

    let Answer::Hit(hit) = answer else {
        panic!("expected a hit, got {answer:?}");
    };
    assert_eq!(hit.query_id, "max_pip_move_week");
    assert!(!hit.result.rows.is_empty());
    assert!(hit.interpretation.is_some());
    assert_eq!(dashboard.log().count().unwrap(), 0);
}

#[tokio::test]
async fn test_limit_caps_curated_rows() {
    let dir = tempdir().unwrap();
    let dashboard = dashboard(&dir.path().join("unanswered.csv"));

    let answer = dashboard
        .ask("show me the pip spikes", &params(), Some(5))
        .await
        .unwrap();
    let Answer::Hit(hit) = answer else {
        panic!("expected a hit");
    };
    assert!(hit.sql.ends_with("LIMIT 5"));
}

#[tokio::test]
async fn test_unanswered_question_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("unanswered.csv");

    {
        let dashboard = dashboard(&path);
        let answer = dashboard
            .ask("What's the weather in Tokyo?", &params(), None)
            .await
            .unwrap();
        let Answer::Miss(miss) = answer else {
            panic!("expected a miss");
        };
        assert_eq!(miss.message, FALLBACK_MESSAGE);
        assert!(miss.logged());
    }

    let dashboard = dashboard(&path);
    dashboard
        .ask("Will the ECB cut rates, \"soon\"?", &params(), None)
        .await
        .unwrap();

    let records = UnansweredLog::new(&path).read_all().unwrap();
    let questions: Vec<&str> = records.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(
        questions,
        vec!["What's the weather in Tokyo?", "Will the ECB cut rates, \"soon\"?"]
    );
    assert!(records.iter().all(|r| r.failed_sql.is_empty()));
}

#[tokio::test]
async fn test_unwritable_log_still_answers_with_fallback() {
    let dir = tempdir().unwrap();
    // A directory cannot be opened as the log file.
    let dashboard = dashboard(dir.path());

    let answer = dashboard
        .ask("What's the weather in Tokyo?", &params(), None)
        .await
        .unwrap();
    let Answer::Miss(miss) = answer else {
        panic!("expected a miss");
    };
    assert_eq!(miss.message, FALLBACK_MESSAGE);
    assert!(miss.log_error.is_some());
}

#[tokio::test]
async fn test_database_failure_on_hit_is_not_logged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unanswered.csv");
    let dashboard = Dashboard::new(
        shipped_store(),
        Box::new(FailingDatabaseClient::new("connection reset")),
        UnansweredLog::new(&path),
    );

    let err = dashboard
        .ask("What is the latest EUR/USD close?", &params(), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(UnansweredLog::new(&path).count().unwrap(), 0);
}

#[tokio::test]
async fn test_atlas_answers_what_the_store_cannot() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(MockLlmClient::new());
    let dashboard = dashboard(&dir.path().join("unanswered.csv"))
        .with_atlas(Atlas::new(llm.clone()));

    let answer = dashboard
        .ask("What was the average range across all candles?", &params(), None)
        .await
        .unwrap();

    let Answer::Generated(generated) = answer else {
        panic!("expected a generated answer, got {answer:?}");
    };
    assert!(generated.sql.contains("$1"));
    // SQL, interpretation and links.
    assert_eq!(llm.calls(), 3);
    assert_eq!(dashboard.log().count().unwrap(), 0);
}

#[tokio::test]
async fn test_atlas_declining_is_logged_with_its_reply() {
    let dir = tempdir().unwrap();
    let dashboard = dashboard(&dir.path().join("unanswered.csv"))
        .with_atlas(Atlas::new(Arc::new(MockLlmClient::new())));

    let answer = dashboard
        .ask("What's the weather in Tokyo?", &params(), None)
        .await
        .unwrap();
    assert!(!answer.is_answered());

    let records = dashboard.log().read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].failed_sql, "NONE");
}
