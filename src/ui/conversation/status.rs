use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// What the status region currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusLine {
    #[default]
    Hidden,
    /// Busy indicator while a request is out
    Spinner,
    Message(String),
}

impl StatusLine {
    pub fn is_busy(&self) -> bool {
        matches!(self, StatusLine::Spinner)
    }
}

impl Widget for &StatusLine {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = match self {
            StatusLine::Hidden => return,
            StatusLine::Spinner => {
                let dots = match (std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis()
                    / 300)
                    % 4
                {
                    0 => ".",
                    1 => "..",
                    2 => "...",
                    _ => "   ",
                };
                Line::from(vec![
                    Span::styled("Duck AI is thinking", Style::default().fg(Color::Green)),
                    Span::styled(dots, Style::default().fg(Color::Yellow)),
                ])
            }
            StatusLine::Message(message) => Line::from(vec![Span::styled(
                message.as_str(),
                Style::default().fg(Color::Yellow),
            )]),
        };
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
