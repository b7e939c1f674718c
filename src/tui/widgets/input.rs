//! Single-line question input.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Number of characters to skip so the cursor stays visible.
pub fn calculate_scroll_offset(cursor: usize, available_width: usize) -> usize {
    cursor.saturating_sub(available_width)
}

pub struct InputBar<'a> {
    text: &'a str,
    cursor: usize,
    focused: bool,
}

impl<'a> InputBar<'a> {
    pub fn new(text: &'a str, cursor: usize, focused: bool) -> Self {
        Self {
            text,
            cursor,
            focused,
        }
    }

    /// Width available for text: borders, the `> ` prompt and one cursor cell.
    pub fn available_width(area: Rect) -> usize {
        area.width.saturating_sub(5) as usize
    }
}

impl Widget for InputBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Ask about EUR/USD (Enter to submit, Tab to switch, Esc to quit) ");

        let prompt_style = Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD);

        let offset = calculate_scroll_offset(self.cursor, Self::available_width(area));
        let visible: String = self.text.chars().skip(offset).collect();

        let line = if self.text.is_empty() && !self.focused {
            Line::from(vec![
                Span::styled("> ", prompt_style),
                Span::styled(
                    "e.g. What was the highest EUR/USD pip movement last week?",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        } else {
            Line::from(vec![Span::styled("> ", prompt_style), Span::raw(visible)])
        };

        Paragraph::new(line).block(block).render(area, buf);
    }
}
