//! Input validation for the chat form

use std::fmt;

use crate::config::Config;
use crate::events::ApiMode;

/// Longest message accepted, in words
pub const MAX_WORDS: usize = 2500;

/// Live state of every chat form widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatForm {
    pub text: String,
    pub api_key: String,
    pub free_tier: bool,
    pub api_mode: ApiMode,
    pub custom_model_requested: bool,
    pub custom_model: String,
    pub language: String,
}

impl ChatForm {
    /// Form widgets as they start out for `config`, with no text
    pub fn from_config(config: &Config) -> Self {
        Self {
            text: String::new(),
            api_key: config.api_key().unwrap_or_default().to_string(),
            free_tier: config.free_tier,
            api_mode: config.api_mode,
            custom_model_requested: config.custom_model.is_some(),
            custom_model: config.custom_model.clone().unwrap_or_default(),
            language: config.language.clone(),
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::new(
            &self.text,
            &self.api_key,
            self.custom_model_requested,
            Some(self.custom_model.as_str()),
        )
    }

    /// Custom model to request, if toggled on and filled in
    pub fn model(&self) -> Option<String> {
        let model = self.custom_model.trim();
        (self.custom_model_requested && !model.is_empty()).then(|| model.to_string())
    }
}

/// The parts of the form validation looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub text: String,
    pub api_key: String,
    pub custom_model_requested: bool,
    pub custom_model_value: Option<String>,
    pub word_count: usize,
}

impl FormSnapshot {
    pub fn new(
        text: &str,
        api_key: &str,
        custom_model_requested: bool,
        custom_model_value: Option<&str>,
    ) -> Self {
        Self {
            text: text.to_string(),
            api_key: api_key.to_string(),
            custom_model_requested,
            custom_model_value: custom_model_value.map(str::to_string),
            word_count: word_count(text),
        }
    }
}

/// Words in `text`: runs of whitespace separate, empty pieces don't count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Outcome of validating a form; exactly one per snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    MissingApiKey,
    EmptyMessage,
    TooLong,
    MissingModel,
    Ready,
}

impl InputStatus {
    pub fn message(&self) -> &'static str {
        match self {
            InputStatus::MissingApiKey => "Enter API key.",
            InputStatus::EmptyMessage => "Enter a message.",
            InputStatus::TooLong => "Message is too long (max 2500 words).",
            InputStatus::MissingModel => "Enter model.",
            InputStatus::Ready => "Generating...",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, InputStatus::Ready)
    }
}

impl fmt::Display for InputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Check a snapshot. The first failing rule wins.
pub fn validate(form: &FormSnapshot, free_tier: bool) -> InputStatus {
    let model_missing = form
        .custom_model_value
        .as_deref()
        .is_none_or(|value| value.trim().is_empty());

    if form.api_key.trim().is_empty() && !free_tier {
        InputStatus::MissingApiKey
    } else if form.text.trim().is_empty() {
        InputStatus::EmptyMessage
    } else if form.word_count > MAX_WORDS {
        InputStatus::TooLong
    } else if form.custom_model_requested && model_missing {
        InputStatus::MissingModel
    } else {
        InputStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(text: &str, key: &str) -> FormSnapshot {
        FormSnapshot::new(text, key, false, None)
    }

    #[test]
    fn form_starts_from_config() {
        let config = Config {
            api_key: Some("sk-saved".into()),
            custom_model: Some("gpt-4o".into()),
            free_tier: false,
            ..Config::default()
        };
        let form = ChatForm::from_config(&config);
        assert!(form.text.is_empty());
        assert_eq!(form.api_key, "sk-saved");
        assert_eq!(form.model().as_deref(), Some("gpt-4o"));
        assert!(!form.free_tier);
    }

    #[test]
    fn happy_path_is_ready() {
        let form = snapshot("Explain photosynthesis", "sk-test");
        assert_eq!(validate(&form, false), InputStatus::Ready);
        assert_eq!(validate(&form, false).message(), "Generating...");
    }

    #[test]
    fn missing_key_wins_over_everything_without_free_tier() {
        let form = FormSnapshot::new("", "", true, Some(""));
        assert_eq!(validate(&form, false), InputStatus::MissingApiKey);
        assert_eq!(validate(&form, true), InputStatus::EmptyMessage);
    }

    #[test]
    fn free_tier_needs_no_key() {
        assert_eq!(validate(&snapshot("hi", ""), true), InputStatus::Ready);
    }

    #[test]
    fn oversized_message_is_rejected() {
        let text = vec!["word"; MAX_WORDS + 1].join(" ");
        let form = FormSnapshot::new(&text, "sk-test", true, Some("gpt"));
        assert_eq!(validate(&form, false), InputStatus::TooLong);
        assert_eq!(
            validate(&form, false).message(),
            "Message is too long (max 2500 words)."
        );

        let text = vec!["word"; MAX_WORDS].join(" ");
        assert_eq!(validate(&snapshot(&text, "k"), false), InputStatus::Ready);
    }

    #[test]
    fn word_count_collapses_whitespace() {
        assert_eq!(word_count("a  b\t\nc "), 3);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn custom_model_must_be_filled() {
        let form = FormSnapshot::new("hi", "k", true, Some("  "));
        assert_eq!(validate(&form, false), InputStatus::MissingModel);

        let form = FormSnapshot::new("hi", "k", true, Some("mistral"));
        assert_eq!(validate(&form, false), InputStatus::Ready);
    }

    #[test]
    fn chat_form_model_only_when_requested() {
        let mut form = ChatForm {
            custom_model: " llama ".into(),
            ..ChatForm::default()
        };
        assert_eq!(form.model(), None);
        form.custom_model_requested = true;
        assert_eq!(form.model().as_deref(), Some("llama"));
    }

    proptest! {
        #[test]
        fn ready_iff_no_blocking_condition(
            text in "[a-z ]{0,20}",
            key in "[a-z]{0,3}",
            requested in any::<bool>(),
            model in proptest::option::of("[a-z ]{0,4}"),
            free in any::<bool>(),
        ) {
            let form = FormSnapshot::new(&text, &key, requested, model.as_deref());
            let status = validate(&form, free);

            let blocked = (key.trim().is_empty() && !free)
                || text.trim().is_empty()
                || form.word_count > MAX_WORDS
                || (requested && model.as_deref().is_none_or(|m| m.trim().is_empty()));

            prop_assert_eq!(status.is_ready(), !blocked);
            prop_assert!([
                "Enter API key.",
                "Enter a message.",
                "Message is too long (max 2500 words).",
                "Enter model.",
                "Generating...",
            ]
            .contains(&status.message()));
        }
    }
}
