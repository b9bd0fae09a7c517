use anyhow::{Context, Result};
use std::path::Path;

use crate::events::{ConversationTurn, Role};

/// Number of trailing turns sent to the backend as prompt context
pub const HISTORY_WINDOW: usize = 10;

/// Rolling conversation for one chat session
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
    conversation_id: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a conversation the server already knows about
    pub fn resumed(conversation_id: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            conversation_id: Some(conversation_id.into()),
        }
    }

    /// Append a turn. Content is taken as-is.
    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) -> &ConversationTurn {
        self.turns.push(ConversationTurn::new(role, content));
        &self.turns[self.turns.len() - 1]
    }

    /// The last `HISTORY_WINDOW` turns as `role: content` lines, oldest first
    pub fn history_window(&self) -> String {
        let start = self.turns.len().saturating_sub(HISTORY_WINDOW);
        self.turns[start..]
            .iter()
            .map(ConversationTurn::history_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full transcript, including turns outside the history window
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last user + assistant pair, if the conversation ends with one
    pub fn latest_exchange(&self) -> Option<&[ConversationTurn]> {
        let start = self.turns.len().checked_sub(2)?;
        let pair = &self.turns[start..];
        (pair[0].role == Role::User && pair[1].role == Role::Assistant).then_some(pair)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Take the server-assigned id unless one is already set.
    ///
    /// Returns `true` only when the id was adopted by this call.
    pub fn adopt_conversation_id(&mut self, id: &str) -> bool {
        if self.conversation_id.is_some() || id.is_empty() {
            return false;
        }
        self.conversation_id = Some(id.to_string());
        true
    }

    /// Seed turns from a serialized transcript.
    ///
    /// Absent, empty and `"null"` inputs are a no-op. Anything that is not a
    /// JSON array of `{role, content}` objects is discarded with a warning.
    /// Returns the number of turns appended.
    pub fn seed_from_transcript(&mut self, raw: Option<&str>) -> usize {
        let Some(raw) = raw.map(str::trim) else {
            return 0;
        };
        if raw.is_empty() || raw == "null" {
            return 0;
        }

        match serde_json::from_str::<Vec<ConversationTurn>>(raw) {
            Ok(parsed) => {
                let count = parsed.len();
                for turn in parsed {
                    self.append_turn(turn.role, turn.content);
                }
                tracing::debug!(turns = count, "seeded conversation from transcript");
                count
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse initial transcript, starting empty");
                0
            }
        }
    }

    /// Serialize all turns in the shape `seed_from_transcript` reads
    pub fn export_transcript(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.turns).context("Failed to serialize transcript")
    }

    /// Write the transcript to disk
    pub async fn export_to(&self, path: &Path) -> Result<()> {
        let content = self.export_transcript()?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write transcript to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state_with(count: usize) -> ConversationState {
        let mut state = ConversationState::new();
        for i in 0..count {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            state.append_turn(role, format!("turn {i}"));
        }
        state
    }

    #[test]
    fn history_window_keeps_last_ten_in_order() {
        let state = state_with(13);
        let window = state.history_window();
        let lines: Vec<&str> = window.lines().collect();

        assert_eq!(lines.len(), HISTORY_WINDOW);
        assert_eq!(lines[0], "assistant: turn 3");
        assert_eq!(lines[9], "user: turn 12");
        // Older turns are still in memory.
        assert_eq!(state.turns().len(), 13);
    }

    #[test]
    fn history_window_of_empty_state_is_empty() {
        assert_eq!(ConversationState::new().history_window(), "");
    }

    #[test]
    fn seeding_ignores_absent_and_null() {
        for raw in [None, Some(""), Some("null"), Some("  null ")] {
            let mut state = ConversationState::new();
            assert_eq!(state.seed_from_transcript(raw), 0);
            assert!(state.is_empty());
        }
    }

    #[test]
    fn seeding_discards_malformed_transcripts() {
        for raw in [
            "{not json",
            r#"{"role":"user","content":"x"}"#,
            r#"[{"role":"system","content":"x"}]"#,
            r#"[{"role":"user"}]"#,
        ] {
            let mut state = ConversationState::new();
            assert_eq!(state.seed_from_transcript(Some(raw)), 0, "input: {raw}");
            assert!(state.is_empty());
        }
    }

    #[test]
    fn seeding_appends_turns_in_order() {
        let raw = r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#;
        let mut state = ConversationState::new();

        assert_eq!(state.seed_from_transcript(Some(raw)), 2);
        assert_eq!(state.history_window(), "user: hi\nassistant: hello");
    }

    #[test]
    fn export_round_trips_through_seed() {
        let state = state_with(3);
        let exported = state.export_transcript().unwrap();

        let mut restored = ConversationState::new();
        restored.seed_from_transcript(Some(&exported));
        assert_eq!(restored.turns(), state.turns());
    }

    #[tokio::test]
    async fn export_to_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        state_with(2).export_to(&path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("turn 1"));
    }

    #[test]
    fn conversation_id_is_adopted_once() {
        let mut state = ConversationState::new();
        assert!(state.adopt_conversation_id("first"));
        assert!(!state.adopt_conversation_id("second"));
        assert_eq!(state.conversation_id(), Some("first"));
    }

    #[test]
    fn resumed_state_keeps_its_id() {
        let mut state = ConversationState::resumed("abc");
        assert!(!state.adopt_conversation_id("xyz"));
        assert_eq!(state.conversation_id(), Some("abc"));
    }

    #[test]
    fn latest_exchange_requires_user_then_assistant() {
        let mut state = ConversationState::new();
        assert!(state.latest_exchange().is_none());
        state.append_turn(Role::User, "q");
        assert!(state.latest_exchange().is_none());
        state.append_turn(Role::Assistant, "a");
        let pair = state.latest_exchange().unwrap();
        assert_eq!(pair[0].content, "q");
        assert_eq!(pair[1].content, "a");
    }

    proptest! {
        #[test]
        fn window_is_bounded_suffix(contents in prop::collection::vec("[a-z ]{0,12}", 0..40)) {
            let mut state = ConversationState::new();
            for (i, content) in contents.iter().enumerate() {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                state.append_turn(role, content.clone());
            }

            let window = state.history_window();
            let expected: Vec<String> = state.turns()
                [state.len().saturating_sub(HISTORY_WINDOW)..]
                .iter()
                .map(ConversationTurn::history_line)
                .collect();

            prop_assert!(expected.len() <= HISTORY_WINDOW);
            prop_assert_eq!(window, expected.join("\n"));
        }
    }
}
