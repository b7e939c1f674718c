//! Parsing of Atlas responses.
//!
//! Pulls SQL out of a chat reply (preferring a ```sql fence, then any fence,
//! then the raw text), keeps only the first statement, and rejects replies
//! that are obviously not a query over `forex_bars`. Also extracts URLs for
//! the learn-more links.

use crate::error::FxLensError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// The only table Atlas may query.
pub const FOREX_TABLE: &str = "forex_bars";

/// Extracts the SQL text from a reply.
pub fn extract_sql(response: &str) -> String {
    let body = extract_code_block(response, "sql")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or_else(|| response.to_string());
    first_statement(body.trim()).trim().to_string()
}

/// Extracts SQL and checks it looks like a SELECT over `forex_bars`.
///
/// The error carries the offending text so it can be logged.
pub fn parse_generated_sql(response: &str) -> std::result::Result<String, RejectedSql> {
    let sql = extract_sql(response);
    let lower = sql.to_lowercase();
    let bare = lower.trim_end_matches(';').trim();

    let reason = if bare.is_empty() || bare == "none" || bare == "null" {
        Some("Atlas returned no SQL")
    } else if !lower.contains("select") {
        Some("Atlas reply is not a SELECT")
    } else if !lower.contains(FOREX_TABLE) {
        Some("Atlas SQL does not use forex_bars")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RejectedSql {
            sql,
            reason: reason.to_string(),
        }),
        None => Ok(sql),
    }
}

/// Generated SQL that failed the sanity checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSql {
    pub sql: String,
    pub reason: String,
}

impl From<RejectedSql> for FxLensError {
    fn from(rejected: RejectedSql) -> Self {
        FxLensError::llm(rejected.reason)
    }
}

/// Returns the body of the first fenced block tagged `lang` (any untagged block when empty).
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find("```") {
        let fence = search_from + offset;
        let after_fence = fence + 3;
        let line_end = text[after_fence..]
            .find('\n')
            .map(|i| after_fence + i)?;
        let tag = text[after_fence..line_end].trim();

        let content_start = line_end + 1;
        let content_end = text[content_start..]
            .find("```")
            .map(|i| content_start + i)?;

        let wanted = if lang.is_empty() {
            true
        } else {
            tag.eq_ignore_ascii_case(lang)
        };
        if wanted {
            return Some(text[content_start..content_end].to_string());
        }
        search_from = content_end + 3;
    }
    None
}

/// Cuts `sql` at the first `;` outside quotes and comments.
fn first_statement(sql: &str) -> &str {
    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b';' => return &sql[..i],
                _ => {}
            },
        }
        i += 1;
    }
    sql
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)https?://[^\s)\]<>]+").expect("url pattern is valid"))
}

/// Extracts unique URLs in order of appearance, from plain text or markdown.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(&['.', ',', ')', ';', ']'][..]).to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sql_fence() {
        let response = "Here you go:\n\n```sql\nSELECT MAX(pip_hl) FROM forex_bars;\n```\nEnjoy.";
        assert_eq!(extract_sql(response), "SELECT MAX(pip_hl) FROM forex_bars");
    }

    #[test]
    fn test_sql_fence_preferred_over_plain_fence() {
        let response = "```\nnot this\n```\n```SQL\nSELECT 1 FROM forex_bars\n```";
        assert_eq!(extract_sql(response), "SELECT 1 FROM forex_bars");
    }

    #[test]
    fn test_plain_fence_and_raw_text() {
        assert_eq!(
            extract_sql("```\nSELECT close FROM forex_bars\n```"),
            "SELECT close FROM forex_bars"
        );
        assert_eq!(
            extract_sql("SELECT close FROM forex_bars;"),
            "SELECT close FROM forex_bars"
        );
    }

    #[test]
    fn test_only_first_statement_kept() {
        let sql = extract_sql("SELECT ';' AS semi FROM forex_bars; DROP TABLE forex_bars;");
        assert_eq!(sql, "SELECT ';' AS semi FROM forex_bars");
    }

    #[test]
    fn test_parse_generated_sql_accepts_forex_query() {
        let sql = parse_generated_sql(
            "```sql\nSELECT \"datetime\", pip_hl FROM forex_bars WHERE CAST(\"datetime\" AS date) BETWEEN :start_date AND :end_date\n```",
        )
        .unwrap();
        assert!(sql.starts_with("SELECT"));
    }

    #[test]
    fn test_parse_generated_sql_rejections() {
        let rejected = parse_generated_sql("NONE;").unwrap_err();
        assert_eq!(rejected.reason, "Atlas returned no SQL");

        let rejected = parse_generated_sql("I can't help with the weather.").unwrap_err();
        assert_eq!(rejected.sql, "I can't help with the weather.");

        let rejected = parse_generated_sql("```sql\nSELECT * FROM users\n```").unwrap_err();
        assert!(rejected.reason.contains("forex_bars"));

        assert!(parse_generated_sql("").is_err());
    }

    #[test]
    fn test_extract_urls() {
        let text = "See https://www.babypips.com/learn/forex/pips.\n\
                    [FXStreet](https://www.fxstreet.com/education)\n\
                    https://www.babypips.com/learn/forex/pips";
        assert_eq!(
            extract_urls(text),
            vec![
                "https://www.babypips.com/learn/forex/pips",
                "https://www.fxstreet.com/education",
            ]
        );
        assert!(extract_urls("no links here").is_empty());
    }
}
