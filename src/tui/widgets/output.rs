//! Output panel: the answer to the last question.

use super::table::ResultTable;
use crate::app::{Answer, CuratedAnswer, GeneratedAnswer, MissAnswer, FALLBACK_MESSAGE};
use crate::tui::app::{App, OutputState};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub struct OutputPanel<'a> {
    state: &'a OutputState,
    scroll: u16,
    focused: bool,
}

impl<'a> OutputPanel<'a> {
    pub fn new(state: &'a OutputState, scroll: u16, focused: bool) -> Self {
        Self {
            state,
            scroll,
            focused,
        }
    }

    /// Builds the panel content for a given inner width.
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        match self.state {
            OutputState::Welcome => welcome_lines(),
            OutputState::Thinking(question) => vec![
                question_line(question),
                Line::from(""),
                Line::from(Span::styled(
                    "Looking that up…",
                    Style::default().fg(Color::Yellow),
                )),
            ],
            OutputState::Answer(Answer::Hit(hit)) => hit_lines(hit, width),
            OutputState::Answer(Answer::Generated(generated)) => generated_lines(generated, width),
            OutputState::Answer(Answer::Miss(miss)) => miss_lines(miss),
            OutputState::Failure { question, error } => vec![
                question_line(question),
                Line::from(""),
                Line::from(Span::styled(
                    App::failure_title(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    let hint = Style::default().fg(Color::Gray);
    vec![
        Line::from(Span::styled(
            "Welcome to FXLens!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Ask a question about EUR/USD below, or pick a curated question from the sidebar.",
            hint,
        )),
        Line::from(Span::styled(
            "Questions FXLens cannot answer yet are logged for review.",
            hint,
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Tab switches panels · ↑/↓ selects or scrolls · Enter asks · Esc quits",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

fn question_line(question: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("You: ", Style::default().fg(Color::Green)),
        Span::raw(question.to_string()),
    ])
}

fn hit_lines(hit: &CuratedAnswer, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            hit.question.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("curated · {}", hit.query_id),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    lines.extend(ResultTable::new(&hit.result).render_to_lines(width));
    push_extras(&mut lines, hit.interpretation.as_deref(), &hit.learn_more);
    lines
}

fn generated_lines(generated: &GeneratedAnswer, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        question_line(&generated.question),
        Line::from(Span::styled(
            "answered by Atlas",
            Style::default().fg(Color::Magenta),
        )),
        Line::from(Span::styled(
            generated.sql.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    lines.extend(ResultTable::new(&generated.result).render_to_lines(width));
    push_extras(
        &mut lines,
        generated.interpretation.as_deref(),
        &generated.learn_more,
    );
    lines
}

fn miss_lines(miss: &MissAnswer) -> Vec<Line<'static>> {
    let mut lines = vec![
        question_line(&miss.question),
        Line::from(""),
        Line::from(Span::styled(
            FALLBACK_MESSAGE,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    let note_style = if miss.logged() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::Red)
    };
    lines.push(Line::from(Span::styled(miss.note(), note_style)));
    if let Some(error) = &miss.atlas_error {
        lines.push(Line::from(Span::styled(
            format!("Atlas: {error}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn push_extras(lines: &mut Vec<Line<'static>>, interpretation: Option<&str>, links: &[String]) {
    let heading = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    if let Some(text) = interpretation {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("What this means", heading)));
        lines.push(Line::from(text.to_string()));
    }
    if !links.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Learn more", heading)));
        for link in links {
            lines.push(Line::from(Span::styled(
                format!("• {link}"),
                Style::default().fg(Color::Blue),
            )));
        }
    }
}

impl Widget for OutputPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Answer ");

        let lines = self.lines(area.width.saturating_sub(2) as usize);
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
