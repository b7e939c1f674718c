//! Plain-text and JSON rendering for the one-shot CLI.

use serde::Serialize;

use crate::app::{Answer, CuratedAnswer, GeneratedAnswer, MissAnswer, FOGGY_MESSAGE};
use crate::db::{QueryParams, QueryResult};
use crate::error::FxLensError;
use crate::persistence::UnansweredRecord;
use crate::registry::CuratedStore;

/// Widest a single text column may grow before values are cut.
const MAX_COLUMN_WIDTH: usize = 40;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned text tables.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Formats answers and log listings for the terminal.
pub struct AnswerOutput {
    format: OutputFormat,
}

impl AnswerOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn answer(&self, answer: &Answer, params: &QueryParams) -> String {
        match self.format {
            OutputFormat::Text => format_answer_text(answer, params),
            OutputFormat::Json => to_json(&JsonAnswer { params, answer }),
        }
    }

    /// Formats a curated query failure.
    pub fn failure(&self, question: &str, error: &FxLensError) -> String {
        match self.format {
            OutputFormat::Text => format!("{FOGGY_MESSAGE}\n{error}\n"),
            OutputFormat::Json => to_json(&serde_json::json!({
                "kind": "error",
                "question": question,
                "category": error.category(),
                "message": FOGGY_MESSAGE,
                "error": error.to_string(),
            })),
        }
    }

    pub fn queries(&self, store: &CuratedStore) -> String {
        match self.format {
            OutputFormat::Text => {
                let rows: Vec<Vec<String>> = store
                    .queries()
                    .iter()
                    .map(|q| vec![q.id.clone(), q.question.clone(), q.triggers.join(", ")])
                    .collect();
                let mut out = render_table(&["id", "question", "triggers"], &rows, &[]);
                out.push_str(&format!("{} curated queries\n", store.len()));
                out
            }
            OutputFormat::Json => to_json(&store.queries()),
        }
    }

    pub fn unanswered(&self, records: &[UnansweredRecord]) -> String {
        match self.format {
            OutputFormat::Text if records.is_empty() => "No unanswered questions.\n".to_string(),
            OutputFormat::Text => {
                let rows: Vec<Vec<String>> = records
                    .iter()
                    .map(|r| vec![r.timestamp.clone(), r.question.clone(), r.failed_sql.clone()])
                    .collect();
                let mut out = render_table(&["timestamp", "question", "failed_sql"], &rows, &[]);
                out.push_str(&format!("{} unanswered questions\n", records.len()));
                out
            }
            OutputFormat::Json => to_json(&records),
        }
    }
}

#[derive(Serialize)]
struct JsonAnswer<'a> {
    params: &'a QueryParams,
    #[serde(flatten)]
    answer: &'a Answer,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e));
    json.push('\n');
    json
}

fn format_answer_text(answer: &Answer, params: &QueryParams) -> String {
    match answer {
        Answer::Hit(hit) => format_hit(hit, params),
        Answer::Generated(generated) => format_generated(generated, params),
        Answer::Miss(miss) => format_miss(miss),
    }
}

fn format_hit(hit: &CuratedAnswer, params: &QueryParams) -> String {
    let mut out = format!("{}\n", hit.question);
    out.push_str(&format!("[{}] {}\n\n", hit.query_id, params.summary()));
    out.push_str(&format_result(&hit.result));
    push_extras(&mut out, hit.interpretation.as_deref(), &hit.learn_more);
    out
}

fn format_generated(generated: &GeneratedAnswer, params: &QueryParams) -> String {
    let mut out = format!("{}\n", generated.question);
    out.push_str(&format!("[atlas] {}\n", params.summary()));
    out.push_str(&format!("SQL: {}\n\n", generated.sql));
    out.push_str(&format_result(&generated.result));
    push_extras(
        &mut out,
        generated.interpretation.as_deref(),
        &generated.learn_more,
    );
    out
}

fn format_miss(miss: &MissAnswer) -> String {
    let mut out = format!("{}\n{}\n", miss.message, miss.note());
    if let Some(error) = &miss.atlas_error {
        out.push_str(&format!("Atlas: {error}\n"));
    }
    out
}

fn push_extras(out: &mut String, interpretation: Option<&str>, links: &[String]) {
    if let Some(text) = interpretation {
        out.push_str(&format!("\nWhat this means:\n{text}\n"));
    }
    if !links.is_empty() {
        out.push_str("\nLearn more:\n");
        for link in links {
            out.push_str(&format!("  - {link}\n"));
        }
    }
}

/// Renders a query result as an aligned table followed by a row count line.
pub fn format_result(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "(no columns)\n".to_string();
    }

    let headers = result.column_names();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|value| value.to_display_string()).collect())
        .collect();
    let numeric: Vec<bool> = result.columns.iter().map(|c| c.is_numeric()).collect();

    let mut out = render_table(&headers, &rows, &numeric);
    let noun = if result.row_count == 1 { "row" } else { "rows" };
    out.push_str(&format!(
        "({} {}, {} ms)\n",
        result.row_count,
        noun,
        result.execution_time.as_millis()
    ));
    if let Some(warning) = result.truncation_warning() {
        out.push_str(&warning);
        out.push('\n');
    }
    out
}

fn render_table(headers: &[&str], rows: &[Vec<String>], numeric: &[bool]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
            }
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &width))| {
                let cell = clip(cell, width);
                if numeric.get(i).copied().unwrap_or(false) {
                    format!("{cell:>width$}")
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = line(&header_cells);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&format!("{}\n", rule.join("-+-")));
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
