//! The dashboard service.
//!
//! Ties the curated store, the database, the unanswered log and the optional
//! Atlas fallback together: a question is resolved against the store, the
//! matched SQL is bound, checked and executed, and anything unmatched is
//! logged before the fallback message is returned.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{apply_limit, bind_named, BoundQuery, DatabaseClient, QueryParams, QueryResult};
use crate::error::{FxLensError, Result};
use crate::llm::{Atlas, AtlasStatus};
use crate::persistence::UnansweredLog;
use crate::registry::{CuratedQuery, CuratedStore, MatchKind, Resolution, Resolver};
use crate::safety::ensure_read_only;

/// Shown when nothing can answer a question.
pub const FALLBACK_MESSAGE: &str = "Atlas shrugged!!! He can't answer that one right now.";

/// Appended to the fallback message once the question is in the log.
pub const LOGGED_NOTE: &str =
    "Your question has been logged so it can be added to the curated queries.";

/// Shown when a curated query fails to run.
pub const FOGGY_MESSAGE: &str = "FXLens is foggy on this one…";

/// The outcome of asking a question.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Answered by a curated query.
    Hit(CuratedAnswer),
    /// Answered by SQL that Atlas wrote.
    Generated(GeneratedAnswer),
    /// Not answered. The question was logged unless `log_error` is set.
    Miss(MissAnswer),
}

impl Answer {
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Miss(_))
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            Self::Hit(hit) => Some(&hit.result),
            Self::Generated(generated) => Some(&generated.result),
            Self::Miss(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CuratedAnswer {
    pub query_id: String,
    /// The curated query's canonical question.
    pub question: String,
    pub match_kind: MatchKind,
    /// SQL as executed, with positional placeholders.
    pub sql: String,
    pub result: QueryResult,
    pub interpretation: Option<String>,
    pub learn_more: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    pub question: String,
    pub sql: String,
    pub result: QueryResult,
    pub interpretation: Option<String>,
    pub learn_more: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissAnswer {
    pub question: String,
    pub message: String,
    /// Why the log write failed, if it did.
    pub log_error: Option<String>,
    /// Why Atlas could not help, when it was asked.
    pub atlas_error: Option<String>,
}

impl MissAnswer {
    pub fn logged(&self) -> bool {
        self.log_error.is_none()
    }

    /// Line shown under the fallback message.
    pub fn note(&self) -> String {
        match &self.log_error {
            None => LOGGED_NOTE.to_string(),
            Some(error) => format!("The question could not be logged: {error}"),
        }
    }
}

/// Answers questions about the forex data.
pub struct Dashboard {
    store: CuratedStore,
    db: Box<dyn DatabaseClient>,
    log: UnansweredLog,
    atlas: Option<Atlas>,
}

impl Dashboard {
    pub fn new(store: CuratedStore, db: Box<dyn DatabaseClient>, log: UnansweredLog) -> Self {
        Self {
            store,
            db,
            log,
            atlas: None,
        }
    }

    /// Enables the Atlas fallback for unmatched questions.
    pub fn with_atlas(mut self, atlas: Atlas) -> Self {
        self.atlas = Some(atlas);
        self
    }

    pub fn store(&self) -> &CuratedStore {
        &self.store
    }

    pub fn log(&self) -> &UnansweredLog {
        &self.log
    }

    pub fn atlas_enabled(&self) -> bool {
        self.atlas.is_some()
    }

    pub async fn atlas_status(&self) -> AtlasStatus {
        match &self.atlas {
            Some(atlas) => atlas.status().await,
            None => AtlasStatus::Disabled,
        }
    }

    /// Matches a question against the curated store without running anything.
    pub fn resolve(&self, question: &str) -> Resolution<'_> {
        Resolver::new(&self.store).resolve(question)
    }

    /// Answers a question.
    ///
    /// Errors are reserved for invalid filters and curated queries that fail
    /// to run. An unmatched question is never an error: it is logged and
    /// returned as [`Answer::Miss`].
    pub async fn ask(
        &self,
        question: &str,
        params: &QueryParams,
        limit: Option<u32>,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FxLensError::query("Please enter a question"));
        }
        params.validate()?;

        match self.resolve(question) {
            Resolution::Matched { query, kind, score } => {
                info!(
                    "Question matched curated query '{}' ({:?}, score {})",
                    query.id, kind, score
                );
                self.run_curated(query, kind, params, limit)
                    .await
                    .map(Answer::Hit)
            }
            Resolution::NotFound => Ok(match &self.atlas {
                Some(atlas) => self.ask_atlas(atlas, question, params, limit).await,
                None => self.miss(question, None, None),
            }),
        }
    }

    /// Runs one curated query with the given filters.
    pub async fn run_curated(
        &self,
        query: &CuratedQuery,
        match_kind: MatchKind,
        params: &QueryParams,
        limit: Option<u32>,
    ) -> Result<CuratedAnswer> {
        let bound = prepare(&query.sql, params, limit)?;
        let result = self
            .db
            .execute_query(&bound.sql, &bound.values)
            .await
            .map_err(|e| {
                warn!("Curated query '{}' failed: {}", query.id, e);
                e
            })?;

        Ok(CuratedAnswer {
            query_id: query.id.clone(),
            question: query.question.clone(),
            match_kind,
            sql: bound.sql,
            result,
            interpretation: query.interpretation.clone(),
            learn_more: query.learn_more.clone(),
        })
    }

    async fn ask_atlas(
        &self,
        atlas: &Atlas,
        question: &str,
        params: &QueryParams,
        limit: Option<u32>,
    ) -> Answer {
        let sql = match atlas.generate_sql(question).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!("Atlas could not draft SQL: {}", e);
                return self.miss(question, Some(&e.failed_sql()), Some(e.to_string()));
            }
        };

        let executed = match prepare(&sql, params, limit) {
            Ok(bound) => self
                .db
                .execute_query(&bound.sql, &bound.values)
                .await
                .map(|result| (bound.sql, result)),
            Err(e) => Err(e),
        };

        match executed {
            Ok((executed_sql, result)) => {
                info!("Atlas answered '{}' with {} rows", question, result.row_count);
                let (interpretation, learn_more) =
                    tokio::join!(atlas.interpret(question), atlas.learn_more(question));
                Answer::Generated(GeneratedAnswer {
                    question: question.to_string(),
                    sql: executed_sql,
                    result,
                    interpretation,
                    learn_more,
                })
            }
            Err(e) => {
                warn!("Atlas SQL was not usable: {}", e);
                self.miss(question, Some(&sql), Some(e.to_string()))
            }
        }
    }

    /// Logs an unanswered question and builds the fallback answer.
    fn miss(&self, question: &str, failed_sql: Option<&str>, atlas_error: Option<String>) -> Answer {
        let log_error = match self.log.append(question, failed_sql) {
            Ok(_) => {
                info!("Logged unanswered question");
                None
            }
            Err(e) => {
                warn!("Could not log unanswered question: {}", e);
                Some(e.to_string())
            }
        };

        Answer::Miss(MissAnswer {
            question: question.to_string(),
            message: FALLBACK_MESSAGE.to_string(),
            log_error,
            atlas_error,
        })
    }

    /// Checks that the database answers.
    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }

    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }
}

/// Binds filters, caps rows and checks the result is a read-only SELECT.
fn prepare(sql: &str, params: &QueryParams, limit: Option<u32>) -> Result<BoundQuery> {
    let bound = bind_named(sql, params)?;
    let sql = apply_limit(&bound.sql, limit);
    ensure_read_only(&sql)?;
    Ok(BoundQuery {
        sql,
        values: bound.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, FailingDatabaseClient, MockDatabaseClient, ParamValue, Value};
    use crate::llm::MockLlmClient;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn params() -> QueryParams {
        QueryParams {
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            threshold_pips: 50,
            min_gap_pips: 5,
            min_daily_pips: 20,
        }
    }

    fn store() -> CuratedStore {
        CuratedStore::from_queries(vec![CuratedQuery {
            id: "max_pip_move_week".to_string(),
            question: "What was the highest EUR/USD pip movement last week?".to_string(),
            aliases: vec![],
            triggers: vec![
                "highest".to_string(),
                "pip movement".to_string(),
                "last week".to_string(),
            ],
            sql: "SELECT MAX(pip_hl) AS max_pips FROM forex_bars \
                  WHERE \"datetime\"::date BETWEEN :start_date AND :end_date;"
                .to_string(),
            interpretation: Some("The widest hourly range in the window.".to_string()),
            learn_more: vec!["https://www.babypips.com/learn/forex/pips-and-pipettes".to_string()],
        }])
        .unwrap()
    }

    fn dashboard(db: Box<dyn DatabaseClient>) -> (Dashboard, TempDir) {
        let dir = tempdir().unwrap();
        let log = UnansweredLog::new(dir.path().join("unanswered.csv"));
        (Dashboard::new(store(), db, log), dir)
    }

    fn max_pips_db() -> MockDatabaseClient {
        MockDatabaseClient::new().with_response(
            "max(pip_hl)",
            QueryResult::with_data(
                vec![ColumnInfo::new("max_pips", "FLOAT8")],
                vec![vec![Value::Float(87.4)]],
            ),
        )
    }

    #[tokio::test]
    async fn test_hit_runs_bound_curated_sql() {
        let (dashboard, _dir) = dashboard(Box::new(max_pips_db()));

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
        assert_eq!(hit.match_kind, MatchKind::Exact);
        assert!(hit.sql.contains("BETWEEN $1 AND $2"));
        assert_eq!(hit.result.scalar(), Some(&Value::Float(87.4)));
        assert_eq!(hit.learn_more.len(), 1);
        assert_eq!(dashboard.log().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_miss_logs_once_and_returns_fallback() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));

        let answer = dashboard
            .ask("What is the weather in Tokyo?", &params(), None)
            .await
            .unwrap();

        let Answer::Miss(miss) = answer else {
            panic!("expected a miss");
        };
        assert_eq!(miss.message, FALLBACK_MESSAGE);
        assert!(miss.logged());

        let records = dashboard.log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question, "What is the weather in Tokyo?");
        assert_eq!(records[0].failed_sql, "");
    }

    #[tokio::test]
    async fn test_log_failure_still_returns_fallback() {
        let dir = tempdir().unwrap();
        let dashboard = Dashboard::new(
            store(),
            Box::new(MockDatabaseClient::new()),
            UnansweredLog::new(dir.path()),
        );

        let answer = dashboard.ask("weather?", &params(), None).await.unwrap();
        let Answer::Miss(miss) = answer else {
            panic!("expected a miss");
        };
        assert_eq!(miss.message, FALLBACK_MESSAGE);
        assert!(!miss.logged());
        assert!(miss.note().contains("could not be logged"));
    }

    #[tokio::test]
    async fn test_curated_failure_is_error_and_not_logged() {
        let (dashboard, _dir) = dashboard(Box::new(FailingDatabaseClient::new("server gone")));

        let err = dashboard
            .ask("highest pip movement last week", &params(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FxLensError::Query(_)));
        assert_eq!(dashboard.log().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_filters_rejected_before_resolution() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        let mut bad = params();
        bad.threshold_pips = 0;

        let err = dashboard.ask("weather?", &bad, None).await.unwrap_err();
        assert!(matches!(err, FxLensError::Config(_)));
        assert_eq!(dashboard.log().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        assert!(dashboard.ask("   ", &params(), None).await.is_err());
        assert_eq!(dashboard.log().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_atlas_generated_answer() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        let dashboard = dashboard.with_atlas(Atlas::new(Arc::new(MockLlmClient::new())));

        let answer = dashboard
            .ask("What was the average daily range?", &params(), Some(10))
            .await
            .unwrap();

        let Answer::Generated(generated) = answer else {
            panic!("expected a generated answer");
        };
        assert!(generated.sql.ends_with("LIMIT 10"));
        assert!(generated.sql.contains("BETWEEN $1 AND $2"));
        assert!(generated.interpretation.is_some());
        assert_eq!(generated.learn_more.len(), 1);
        assert_eq!(dashboard.log().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_atlas_unsafe_sql_is_logged() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        let llm = MockLlmClient::new().with_response(
            "purge",
            "```sql\nDELETE FROM forex_bars WHERE id IN (SELECT id FROM forex_bars)\n```",
        );
        let dashboard = dashboard.with_atlas(Atlas::new(Arc::new(llm)));

        let answer = dashboard.ask("purge old bars", &params(), None).await.unwrap();
        let Answer::Miss(miss) = answer else {
            panic!("expected a miss");
        };
        assert!(miss.atlas_error.unwrap().contains("Unsafe SQL"));

        let records = dashboard.log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].failed_sql.starts_with("DELETE FROM forex_bars"));
    }

    #[tokio::test]
    async fn test_atlas_request_failure_is_logged_as_error() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        let dashboard =
            dashboard.with_atlas(Atlas::new(Arc::new(MockLlmClient::new().failing("offline"))));

        let answer = dashboard.ask("weather?", &params(), None).await.unwrap();
        assert!(!answer.is_answered());

        let records = dashboard.log().read_all().unwrap();
        assert!(records[0].failed_sql.starts_with("ERROR: "));
    }

    #[tokio::test]
    async fn test_bound_values_reach_database() {
        let db = Arc::new(max_pips_db());
        let (dashboard, _dir) = dashboard(Box::new(SharedDb(Arc::clone(&db))));

        dashboard
            .ask("highest pip movement last week", &params(), None)
            .await
            .unwrap();

        let executed = db.executed();
        assert_eq!(
            executed[0].params,
            vec![
                ParamValue::Date(params().start_date),
                ParamValue::Date(params().end_date),
            ]
        );
    }

    #[tokio::test]
    async fn test_atlas_status_disabled_by_default() {
        let (dashboard, _dir) = dashboard(Box::new(MockDatabaseClient::new()));
        assert!(!dashboard.atlas_enabled());
        assert_eq!(dashboard.atlas_status().await, AtlasStatus::Disabled);
    }

    /// Lets a test keep a handle on the mock after handing it to the dashboard.
    struct SharedDb(Arc<MockDatabaseClient>);

    #[async_trait::async_trait]
    impl DatabaseClient for SharedDb {
        async fn execute_query(&self, sql: &str, params: &[ParamValue]) -> Result<QueryResult> {
            self.0.execute_query(sql, params).await
        }

        async fn ping(&self) -> Result<()> {
            self.0.ping().await
        }

        async fn close(&self) -> Result<()> {
            self.0.close().await
        }
    }
}
