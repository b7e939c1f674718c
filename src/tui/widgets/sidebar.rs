//! Sidebar: answering mode, Atlas status, active filters and the curated questions.

use crate::db::QueryParams;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub struct Sidebar<'a> {
    mode: &'a str,
    atlas_status: &'a str,
    params: &'a QueryParams,
    questions: &'a [String],
    selected: usize,
    focused: bool,
}

impl<'a> Sidebar<'a> {
    pub fn new(
        mode: &'a str,
        atlas_status: &'a str,
        params: &'a QueryParams,
        questions: &'a [String],
        selected: usize,
        focused: bool,
    ) -> Self {
        Self {
            mode,
            atlas_status,
            params,
            questions,
            selected,
            focused,
        }
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let label = Style::default().fg(Color::DarkGray);
        let heading = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::from(vec![Span::styled("Mode   ", label), Span::raw(self.mode)]),
            Line::from(vec![
                Span::styled("Atlas  ", label),
                Span::raw(self.atlas_status),
            ]),
            Line::from(""),
            Line::from(Span::styled("Filters", heading)),
            Line::from(format!(
                "{} → {}",
                self.params.start_date, self.params.end_date
            )),
            Line::from(format!("Spike threshold  {} pips", self.params.threshold_pips)),
            Line::from(format!("Min gap          {} pips", self.params.min_gap_pips)),
            Line::from(format!("Min daily range  {} pips", self.params.min_daily_pips)),
            Line::from(""),
            Line::from(Span::styled("Curated questions", heading)),
        ];

        for (i, question) in self.questions.iter().enumerate() {
            let line = if i == self.selected && self.focused {
                Line::from(Span::styled(
                    format!("▶ {question}"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {question}"))
            };
            lines.push(line);
        }
        lines
    }
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Dashboard ");

        // Keep the highlighted question in view.
        let header_lines = 10;
        let visible = area.height.saturating_sub(2) as usize;
        let scroll = (header_lines + self.selected + 1).saturating_sub(visible);

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll as u16, 0))
            .render(area, buf);
    }
}
