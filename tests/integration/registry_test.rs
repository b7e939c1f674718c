//! Resolution tests against the curated queries shipped in `queries/`.

use fxlens::registry::{CuratedStore, MatchKind, Resolution, Resolver};
use std::path::PathBuf;

fn shipped_store() -> CuratedStore {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("queries");
    CuratedStore::load_dir(&dir).expect("shipped queries should load")
}

fn resolved_id(store: &CuratedStore, question: &str) -> Option<String> {
    Resolver::new(store)
        .resolve(question)
        .query()
        .map(|q| q.id.clone())
}

#[test]
fn test_shipped_queries_load_in_file_order() {
    let store = shipped_store();
    assert!(store.len() >= 10);
    assert_eq!(store.queries()[0].id, "latest_close");
    assert!(store.get("max_pip_move_week").is_some());
    assert!(store.get("opening_gaps").is_some());
}

#[test]
fn test_every_canonical_question_resolves_to_itself() {
    let store = shipped_store();
    let resolver = Resolver::new(&store);

    for query in store.queries() {
        match resolver.resolve(&query.question) {
            Resolution::Matched { query: found, kind, .. } => {
                assert_eq!(found.id, query.id, "question: {}", query.question);
                assert_eq!(kind, MatchKind::Exact);
            }
            Resolution::NotFound => panic!("'{}' did not resolve", query.question),
        }
    }
}

#[test]
fn test_every_curated_sql_is_a_bounded_select() {
    let store = shipped_store();
    for query in store.queries() {
        let sql = query.sql.to_lowercase();
        assert!(
            sql.trim_start().starts_with("select") || sql.trim_start().starts_with("with"),
            "{} is not a SELECT",
            query.id
        );
        assert!(sql.contains("forex_bars"), "{} does not read forex_bars", query.id);
        assert!(sql.contains(":start_date"), "{} ignores the date filter", query.id);
    }
}

#[test]
fn test_reworded_questions_match_on_keywords() {
    let store = shipped_store();
    assert_eq!(
        resolved_id(&store, "highest pip movement last week please").as_deref(),
        Some("max_pip_move_week")
    );
    assert_eq!(
        resolved_id(&store, "show me the pip spikes").as_deref(),
        Some("pip_spikes")
    );
    assert_eq!(
        resolved_id(&store, "Where were the gaps on Monday?").as_deref(),
        Some("opening_gaps")
    );
    assert_eq!(
        resolved_id(&store, "average hourly range this month").as_deref(),
        Some("average_hourly_range")
    );
}

#[test]
fn test_singular_question_matches_plural_trigger() {
    let store = shipped_store();
    assert_eq!(
        resolved_id(&store, "show the pip spike").as_deref(),
        Some("pip_spikes")
    );
    assert_eq!(
        resolved_id(&store, "was there a gap this morning").as_deref(),
        Some("opening_gaps")
    );
}

#[test]
fn test_more_specific_triggers_win() {
    let store = shipped_store();
    // "daily range" and "days / above / range" both match; the latter has more tokens.
    assert_eq!(
        resolved_id(&store, "days where the daily range was above 50 pips").as_deref(),
        Some("wide_range_days")
    );
}

#[test]
fn test_alias_is_exact_match() {
    let store = shipped_store();
    let resolution = Resolver::new(&store).resolve("Latest price");
    assert!(matches!(
        resolution,
        Resolution::Matched {
            kind: MatchKind::Exact,
            ..
        }
    ));
    assert_eq!(resolution.query().map(|q| q.id.as_str()), Some("latest_close"));
}

#[test]
fn test_unrelated_questions_do_not_match() {
    let store = shipped_store();
    for question in [
        "What's the weather in Tokyo?",
        "Who won the match yesterday?",
        "",
        "?!",
    ] {
        assert_eq!(resolved_id(&store, question), None, "question: {question:?}");
    }
}
