//! Command-line behaviour of the `fxlens` binary.

use super::common::Fixture;

#[test]
fn test_ask_hit_exits_zero_and_prints_table() {
    let fx = Fixture::new();
    let (code, stdout, stderr) = fx.run(&[
        "ask",
        "What was the highest EUR/USD pip movement last week?",
    ]);

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("[max_pip_move_week]"));
    assert!(stdout.contains("rows"));
    assert!(!fx.log_path().exists());
}

#[test]
fn test_ask_joins_unquoted_words() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run(&["ask", "show", "me", "the", "pip", "spikes"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[pip_spikes]"));
}

#[test]
fn test_ask_miss_exits_two_and_logs() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run(&["ask", "What's the weather in Tokyo?"]);

    assert_eq!(code, 2);
    assert!(stdout.contains("Atlas shrugged!!!"));
    assert!(stdout.contains("has been logged"));

    let (code, stdout, _) = fx.run(&["unanswered", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("What's the weather in Tokyo?"));
    assert!(stdout.contains("1 unanswered questions"));
}

#[test]
fn test_ask_json_output() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run(&["ask", "--json", "latest price"]);
    assert_eq!(code, 0);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["kind"], "hit");
    assert_eq!(json["query_id"], "latest_close");
    assert_eq!(json["match_kind"], "exact");
    assert!(json["params"]["start_date"].is_string());
}

#[test]
fn test_invalid_filters_fail_without_logging() {
    let fx = Fixture::new();
    let (code, _, stderr) = fx.run(&[
        "--start-date",
        "2025-03-10",
        "--end-date",
        "2025-03-01",
        "ask",
        "What's the weather in Tokyo?",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("after end date"));
    assert!(!fx.log_path().exists());
}

#[test]
fn test_blank_question_is_an_error() {
    let fx = Fixture::new();
    let (code, _, stderr) = fx.run(&["ask", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Please enter a question"));
}

#[test]
fn test_queries_lists_the_store() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run(&["queries", "--json"]);
    assert_eq!(code, 0);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|q| q["id"].as_str())
        .collect();
    assert!(ids.contains(&"max_pip_move_week"));
    assert!(ids.contains(&"opening_gaps"));
}

#[test]
fn test_unanswered_path_and_empty_list() {
    let fx = Fixture::new();

    let (code, stdout, _) = fx.run(&["unanswered", "path"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), fx.log_path().display().to_string());

    let (code, stdout, _) = fx.run(&["unanswered", "list"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "No unanswered questions.\n");
}

#[test]
fn test_clear_requires_confirmation() {
    let fx = Fixture::new();
    fx.run(&["ask", "Who won the match yesterday?"]);

    let (code, _, stderr) = fx.run(&["unanswered", "clear"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--yes"));

    let (_, stdout, _) = fx.run(&["unanswered", "list", "--json"]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);

    let (code, stdout, _) = fx.run(&["unanswered", "clear", "--yes"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Cleared 1"));

    let (_, stdout, _) = fx.run(&["unanswered", "list"]);
    assert_eq!(stdout, "No unanswered questions.\n");
}

#[test]
fn test_health_with_sample_database() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run(&["health"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Database: ok (sample data)"));
    assert!(stdout.contains("Atlas: disabled"));
}

#[test]
fn test_miss_is_logged_without_a_database() {
    let fx = Fixture::new();
    let (code, stdout, stderr) = fx.run_without_database(&["ask", "What is the weather in Tokyo?"]);

    assert_eq!(code, 2, "stderr: {stderr}");
    assert!(stdout.contains("Atlas shrugged!!!"));

    let (_, stdout, _) = fx.run_without_database(&["unanswered", "list", "--json"]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["question"], "What is the weather in Tokyo?");
}

#[test]
fn test_hit_without_a_database_is_foggy() {
    let fx = Fixture::new();
    let (code, stdout, _) = fx.run_without_database(&["ask", "latest price"]);

    assert_eq!(code, 1);
    assert!(stdout.contains("FXLens is foggy on this one…"));
    assert!(stdout.contains("No database configured"));
    assert!(!fx.log_path().exists());
}
