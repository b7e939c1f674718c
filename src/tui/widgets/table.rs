//! Result table widget.
//!
//! Renders a query result as box-drawn lines with auto-sized columns,
//! right-aligned numbers and dimmed NULLs.

use crate::db::{QueryResult, Value};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 28;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

pub struct ResultTable<'a> {
    result: &'a QueryResult,
}

impl<'a> ResultTable<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.result.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.to_display_string().chars().count());
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Cuts `s` to `max_width` characters, ending in an ellipsis when cut.
    fn truncate(s: &str, max_width: usize) -> String {
        if s.chars().count() <= max_width {
            s.to_string()
        } else if max_width <= 1 {
            s.chars().take(max_width).collect()
        } else {
            let mut cut: String = s.chars().take(max_width - 1).collect();
            cut.push('…');
            cut
        }
    }

    /// Renders the table, shrinking columns to fit `available_width`.
    pub fn render_to_lines(&self, available_width: usize) -> Vec<Line<'static>> {
        if self.result.columns.is_empty() {
            return vec![Line::from(Span::styled(
                "(empty result)",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        let widths = self.column_widths();
        let total: usize = widths.iter().sum::<usize>() + widths.len() * 3 + 1;
        let widths: Vec<usize> = if total > available_width && available_width > 0 {
            let scale = available_width as f64 / total as f64;
            widths
                .iter()
                .map(|&w| ((w as f64 * scale) as usize).max(MIN_COLUMN_WIDTH))
                .collect()
        } else {
            widths
        };

        let mut lines = vec![
            border(&widths, '┌', '┬', '┐'),
            self.header_row(&widths),
            border(&widths, '├', '┼', '┤'),
        ];
        if self.result.rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "│ no rows for the selected filters",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for row in &self.result.rows {
            lines.push(self.data_row(row, &widths));
        }
        lines.push(border(&widths, '└', '┴', '┘'));

        let footer = format!(
            "{} row{} ({}ms)",
            self.result.row_count,
            if self.result.row_count == 1 { "" } else { "s" },
            self.result.execution_time.as_millis()
        );
        lines.push(Line::from(Span::styled(
            footer,
            Style::default().fg(Color::DarkGray),
        )));
        if let Some(warning) = self.result.truncation_warning() {
            lines.push(Line::from(Span::styled(
                warning,
                Style::default().fg(Color::Yellow),
            )));
        }

        lines
    }

    fn header_row(&self, widths: &[usize]) -> Line<'static> {
        let mut spans = vec![separator()];
        for (col, &width) in self.result.columns.iter().zip(widths) {
            let name = Self::truncate(&col.name, width);
            spans.push(Span::styled(
                format!(" {name:width$} "),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(separator());
        }
        Line::from(spans)
    }

    fn data_row(&self, row: &[Value], widths: &[usize]) -> Line<'static> {
        let mut spans = vec![separator()];
        for ((value, &width), col) in row.iter().zip(widths).zip(&self.result.columns) {
            let text = Self::truncate(&value.to_display_string(), width);
            let padded = if col.is_numeric() {
                format!(" {text:>width$} ")
            } else {
                format!(" {text:width$} ")
            };
            let style = if value.is_null() {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default()
            };
            spans.push(Span::styled(padded, style));
            spans.push(separator());
        }
        Line::from(spans)
    }
}

fn separator() -> Span<'static> {
    Span::styled("│", Style::default().fg(Color::DarkGray))
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> Line<'static> {
    let inner: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
    let text = format!("{left}{}{right}", inner.join(&mid.to_string()));
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}
