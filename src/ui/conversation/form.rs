use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::validate::ChatForm;

/// Settings panel: the non-text part of the chat form plus usage and link
pub struct FormPanel<'a> {
    pub form: &'a ChatForm,
    pub usage_label: &'a str,
    pub location: &'a str,
}

/// Rows shown for a form. Credential rows are hidden on the free tier,
/// since the server supplies its own key there.
pub fn visible_fields(form: &ChatForm) -> Vec<(&'static str, String)> {
    let mut fields = vec![(
        "Free tier",
        if form.free_tier { "on" } else { "off" }.to_string(),
    )];

    if !form.free_tier {
        fields.push(("API key", mask_key(&form.api_key)));
        fields.push(("Provider", form.api_mode.to_string()));
        let model = if form.custom_model_requested {
            if form.custom_model.trim().is_empty() {
                "(enter with /model)".to_string()
            } else {
                form.custom_model.trim().to_string()
            }
        } else {
            "default".to_string()
        };
        fields.push(("Model", model));
    }

    fields.push(("Language", form.language.clone()));
    fields
}

/// Show only the last four characters of a key
pub fn mask_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "(not set, use /key)".to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("••••{tail}")
}

impl Widget for FormPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Settings");
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = visible_fields(self.form)
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
                    Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
                ])
            })
            .collect();

        if self.form.free_tier && !self.usage_label.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                self.usage_label.to_string(),
                Style::default().fg(Color::Cyan),
            )));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Link:",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            self.location.to_string(),
            Style::default().fg(Color::Blue),
        )));

        for (i, line) in lines.iter().enumerate() {
            if i >= inner.height as usize {
                break;
            }
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}
