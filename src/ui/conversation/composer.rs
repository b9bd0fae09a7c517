use crate::ui::conversation::commands::{parse_slash_command, CommandEntry, ParsedCommand, COMMAND_ENTRIES};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    /// Enter pressed on a message; the text stays until the send consumes it
    Submitted(String),
    Command(ParsedCommand),
    /// Text changed
    Edited,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Byte offset, always on a char boundary
    pub cursor_position: usize,
}

impl TextAreaState {
    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor_position]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor_position..]
            .chars()
            .next()
            .map(|c| self.cursor_position + c.len_utf8())
    }
}

/// Conversation composer for user input
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    send_enabled: bool,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            send_enabled: false,
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                    return ConversationResult::Edited;
                }
                if self.show_command_palette && self.apply_selected_command() {
                    return ConversationResult::Edited;
                }
                if let Some(command) = parse_slash_command(&self.state.content) {
                    self.clear();
                    return ConversationResult::Command(command);
                }
                return ConversationResult::Submitted(self.state.content.clone());
            }
            KeyCode::Up if self.show_command_palette => {
                self.move_command_selection(-1);
            }
            KeyCode::Down if self.show_command_palette => {
                self.move_command_selection(1);
            }
            KeyCode::Esc if self.show_command_palette => {
                self.close_command_palette();
            }
            KeyCode::Tab if self.show_command_palette => {
                if self.apply_selected_command() {
                    return ConversationResult::Edited;
                }
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_command_palette(Some(c));
                return ConversationResult::Edited;
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette(None);
                    return ConversationResult::Edited;
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette(None);
                    return ConversationResult::Edited;
                }
            }
            KeyCode::Left => {
                if let Some(prev) = self.state.prev_boundary() {
                    self.state.cursor_position = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = self.state.next_boundary() {
                    self.state.cursor_position = next;
                }
            }
            KeyCode::Home => {
                self.state.cursor_position = 0;
            }
            KeyCode::End => {
                self.state.cursor_position = self.state.content.len();
            }
            _ => {}
        }

        ConversationResult::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        self.state.content.insert_str(self.state.cursor_position, text);
        self.state.cursor_position += text.len();
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        self.state.content.insert(self.state.cursor_position, c);
        self.state.cursor_position += c.len_utf8();
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        match self.state.prev_boundary() {
            Some(prev) => {
                self.state.content.remove(prev);
                self.state.cursor_position = prev;
                true
            }
            None => false,
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.state.cursor_position < self.state.content.len() {
            self.state.content.remove(self.state.cursor_position);
            true
        } else {
            false
        }
    }

    /// Open, refresh or close the palette after an edit
    fn sync_command_palette(&mut self, typed: Option<char>) {
        let is_command = self.state.content.starts_with('/');
        let typed_space = typed.is_some_and(char::is_whitespace);

        if is_command && !typed_space && !self.state.content.contains(char::is_whitespace) {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = COMMAND_ENTRIES
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return false;
        };

        self.state.content = format!("/{} ", entry.keyword);
        self.state.cursor_position = self.state.content.len();
        self.close_command_palette();
        true
    }

    pub fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Replace the whole text, cursor at the end
    pub fn set_content(&mut self, content: String) {
        self.state.cursor_position = content.len();
        self.state.content = content;
        self.close_command_palette();
    }

    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
        self.close_command_palette();
    }

    /// Rows needed to show the text, capped for the layout
    pub fn desired_height(&self) -> u16 {
        let lines = self.state.content.split('\n').count().clamp(1, 8);
        lines as u16 + 2
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.send_enabled {
            "Message (Enter to send, Shift+Enter for newline, / for commands)"
        } else {
            "Message (send disabled)"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if self.send_enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.state.content.clone();
            content.insert(self.state.cursor_position.min(content.len()), '▌');

            // Keep the cursor end visible when the text is taller than the box.
            let lines: Vec<&str> = content.split('\n').collect();
            let start = lines.len().saturating_sub(inner_area.height as usize);
            for (i, line_text) in lines[start..].iter().enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(6) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            Clear.render(palette_area, buf);

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            // Scroll so the selection stays inside the palette.
            let visible = inner.height as usize;
            let selected = self.selected_command.unwrap_or(0);
            let offset = selected.saturating_sub(visible.saturating_sub(1));

            for (row, (index, entry)) in self
                .filtered_commands
                .iter()
                .enumerate()
                .skip(offset)
                .take(visible)
                .enumerate()
            {
                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" - ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);
                buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
            }
        }
    }
}
