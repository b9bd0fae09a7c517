//! Conversation history display component

use crate::events::{ConversationTurn, Role};
use chrono::{DateTime, Local};
use std::cell::Cell;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Who a history entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Turn(Role),
    /// Local notices such as help output; never sent to the backend
    Notice,
}

/// A single entry in the displayed transcript
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

/// Conversation history display component
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
    /// Lines scrolled up from the bottom
    scroll_offset: usize,
    /// Largest useful offset, as of the last render
    max_offset: Cell<usize>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: EntryKind, content: String) {
        self.entries.push(HistoryEntry {
            kind,
            content,
            timestamp: Local::now(),
        });
        self.scroll_to_bottom();
    }

    pub fn add_turn(&mut self, turn: &ConversationTurn) {
        self.push(EntryKind::Turn(turn.role), turn.content.clone());
    }

    pub fn add_notice(&mut self, content: impl Into<String>) {
        self.push(EntryKind::Notice, content.into());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(self.max_offset.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_offset = 0;
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of transcript turns, notices excluded
    pub fn turn_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::Turn(_)))
            .count()
    }

    fn render_entry(entry: &HistoryEntry, width: u16) -> Vec<Line<'static>> {
        let (label, color) = match entry.kind {
            EntryKind::Turn(Role::User) => (Role::User.display_name(), Color::Cyan),
            EntryKind::Turn(Role::Assistant) => (Role::Assistant.display_name(), Color::Green),
            EntryKind::Notice => ("duckchat", Color::Yellow),
        };

        let mut lines = vec![Line::from(vec![
            Span::styled(
                label.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", entry.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ])];

        let text_style = match entry.kind {
            EntryKind::Notice => Style::default().fg(Color::Gray),
            _ => Style::default(),
        };
        for paragraph in entry.content.split('\n') {
            for wrapped in wrap_text(paragraph, width.saturating_sub(2) as usize) {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(wrapped, text_style),
                ]));
            }
        }
        lines
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Duck AI");

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() {
            let welcome_lines = vec![
                Line::from(vec![Span::styled(
                    "Ask Duck AI anything about your studies.",
                    Style::default().fg(Color::Green),
                )]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Type / to see commands, /free to toggle the free tier.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for entry in &self.entries {
            all_lines.extend(ConversationHistory::render_entry(entry, inner_area.width));
            all_lines.push(Line::from(""));
        }

        // Show the window ending `scroll_offset` lines above the bottom.
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        self.max_offset.set(max_offset);
        let offset = self.scroll_offset.min(max_offset);
        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text on word boundaries to fit within `width` columns
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if current_width > 0 && current_width + 1 + word_width > width {
            lines.push(std::mem::take(&mut current_line));
            current_width = 0;
        }
        if current_width > 0 {
            current_line.push(' ');
            current_width += 1;
        }
        current_line.push_str(word);
        current_width += word_width;
    }

    if !current_line.is_empty() || lines.is_empty() {
        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap_text("the quick brown fox", 9), vec!["the quick", "brown fox"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn long_words_get_their_own_line() {
        assert_eq!(wrap_text("a supercalifragilistic b", 5), vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn notices_are_not_turns() {
        let mut history = ConversationHistory::new();
        history.add_turn(&ConversationTurn::new(Role::User, "hi"));
        history.add_notice("help text");
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.turn_count(), 1);
    }

    #[test]
    fn scrolling_stops_at_the_top() {
        let mut history = ConversationHistory::new();
        for i in 0..20 {
            history.add_notice(format!("line {i}"));
        }
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        (&history).render(area, &mut buf);
        let max = history.max_offset.get();
        assert!(max > 0);

        history.scroll_up(1000);
        assert_eq!(history.scroll_offset, max);

        // The first PageDown after overshooting moves the view.
        history.scroll_down(5);
        assert_eq!(history.scroll_offset, max - 5);
    }

    #[test]
    fn new_entries_scroll_to_bottom() {
        let mut history = ConversationHistory::new();
        history.scroll_up(5);
        history.add_notice("x");
        history.scroll_down(1);
        assert_eq!(history.scroll_offset, 0);
    }
}
