//! Layout and rendering of the dashboard.

use super::app::{App, Focus};
use super::widgets::{header, input, output, sidebar};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

/// Renders the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Sidebar + answer
            Constraint::Length(3), // Input
        ])
        .split(area);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(main_layout[1]);

    render_header(frame, main_layout[0], app);
    render_sidebar(frame, content_layout[0], app);
    render_output(frame, content_layout[1], app);
    render_input(frame, main_layout[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let widget = header::Header::new(app.mode, &app.db_label, app.is_processing());
    frame.render_widget(widget, area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let widget = sidebar::Sidebar::new(
        app.mode,
        &app.atlas_status,
        &app.params,
        &app.questions,
        app.selected,
        app.focus == Focus::Sidebar,
    );
    frame.render_widget(widget, area);
}

fn render_output(frame: &mut Frame, area: Rect, app: &App) {
    let widget = output::OutputPanel::new(&app.output, app.output_scroll, app.focus == Focus::Output);
    frame.render_widget(widget, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Input;
    let widget = input::InputBar::new(&app.input.text, app.input.cursor, focused);
    frame.render_widget(widget, area);

    if focused {
        // Border (1) and prompt "> " (2)
        let visible_cursor = app
            .input
            .cursor
            .min(input::InputBar::available_width(area));
        let cursor_x = area.x + 1 + 2 + visible_cursor as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Answer, CuratedAnswer};
    use crate::db::{MockDatabaseClient, QueryParams};
    use crate::registry::{CuratedQuery, CuratedStore, MatchKind};
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn app() -> App {
        let store = CuratedStore::from_queries(vec![CuratedQuery {
            id: "latest_close".to_string(),
            question: "What is the latest EUR/USD close?".to_string(),
            aliases: vec![],
            triggers: vec!["latest".to_string(), "close".to_string()],
            sql: "SELECT close FROM forex_bars".to_string(),
            interpretation: None,
            learn_more: vec![],
        }])
        .unwrap();
        let params = QueryParams {
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            threshold_pips: 50,
            min_gap_pips: 5,
            min_daily_pips: 20,
        };
        App::new(&store, params, false).with_db_label("sample data")
    }

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_initial_screen() {
        let out = screen(&app(), 120, 30);
        assert!(out.contains("FXLens v"));
        assert!(out.contains("[db: sample data]"));
        assert!(out.contains("Welcome to FXLens!"));
        assert!(out.contains("2025-03-03 → 2025-03-10"));
        assert!(out.contains("What is the latest EUR/USD close?"));
    }

    #[test]
    fn test_hit_renders_table() {
        let mut app = app();
        app.set_answer(Answer::Hit(CuratedAnswer {
            query_id: "latest_close".to_string(),
            question: "What is the latest EUR/USD close?".to_string(),
            match_kind: MatchKind::Exact,
            sql: "SELECT close FROM forex_bars".to_string(),
            result: MockDatabaseClient::sample_bars(),
            interpretation: Some("Most recent hourly close.".to_string()),
            learn_more: vec![],
        }));
        let out = screen(&app, 200, 40);
        assert!(out.contains("curated · latest_close"));
        assert!(out.contains("pip_hl"));
        assert!(out.contains("EURUSD"));
    }

    #[test]
    fn test_small_terminal_does_not_panic() {
        screen(&app(), 20, 6);
    }
}
