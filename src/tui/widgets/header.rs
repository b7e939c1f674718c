//! Header bar: application name, answering mode and data source.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Widget,
};

pub struct Header<'a> {
    mode: &'a str,
    db_label: &'a str,
    busy: bool,
}

impl<'a> Header<'a> {
    pub fn new(mode: &'a str, db_label: &'a str, busy: bool) -> Self {
        Self {
            mode,
            db_label,
            busy,
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        for x in area.left()..area.right() {
            buf[(x, area.y)].set_style(style);
        }

        let left = format!(" FXLens v{} · EUR/USD · {}", env!("CARGO_PKG_VERSION"), self.mode);
        buf.set_span(area.x, area.y, &Span::styled(left, style), area.width);

        if self.busy {
            let text = "thinking…";
            let x = area.x + area.width.saturating_sub(text.chars().count() as u16) / 2;
            buf.set_string(x, area.y, text, style.fg(Color::Yellow));
        }

        if !self.db_label.is_empty() {
            let right = format!(" [db: {}] ", self.db_label);
            let width = right.chars().count() as u16;
            if width < area.width / 2 {
                buf.set_string(area.right() - width, area.y, &right, style);
            }
        }
    }
}
