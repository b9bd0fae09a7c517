use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use strum::EnumString;
use tokio::sync::mpsc;

use crate::validate::ChatForm;

/// Commands sent from the front end to the chat worker
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Run one send action for the given form state
    Send(ChatForm),

    /// Re-read the free usage counter
    RefreshUsage,

    /// The free-tier checkbox changed
    SetFreeTier(bool),

    /// Upload a notes file and use its text as the next message
    Upload(PathBuf),

    /// Drop the current conversation and start a fresh one
    NewConversation,

    /// Write the full transcript to a file
    Export(PathBuf),

    /// Stop the worker
    Shutdown,
}

/// Updates emitted by the chat worker for the front end to render
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A turn was appended to the conversation and should be displayed
    TurnAppended(ConversationTurn),

    /// Show a plain status message (hides the spinner)
    Status(String),

    /// Show the busy indicator (clears any status text)
    Spinner,

    /// Hide both status text and spinner
    StatusCleared,

    /// The composer text was consumed by a send
    InputCleared,

    /// The composer text should be replaced (e.g. with uploaded notes)
    InputReplaced(String),

    /// Enable or disable the send control
    SendControl(bool),

    /// The send action finished, whatever its outcome
    SendIdle,

    /// Fresh usage counter information
    UsageUpdated { remaining: u32, label: String },

    /// The conversation link changed
    LocationChanged(String),

    /// The conversation was discarded
    ConversationReset,

    /// Turns restored from a saved transcript at startup
    TranscriptLoaded(Vec<ConversationTurn>),
}

/// Sink for chat events.
///
/// The send controller only ever talks to the outside world through this
/// trait, so it can be driven by the terminal UI, the console, or a test.
pub trait ChatView {
    fn emit(&mut self, event: ChatEvent);
}

impl ChatView for mpsc::UnboundedSender<ChatEvent> {
    fn emit(&mut self, event: ChatEvent) {
        // A closed receiver means the UI is gone; nothing left to update.
        let _ = self.send(event);
    }
}

impl ChatView for Vec<ChatEvent> {
    fn emit(&mut self, event: ChatEvent) {
        self.push(event);
    }
}

/// Role in conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Duck AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// The `role: content` line used in prompt history
    pub fn history_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Which provider the backend should call with the user's own key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
pub enum ApiMode {
    #[default]
    #[serde(rename = "OpenAI")]
    #[strum(serialize = "OpenAI", serialize = "openai")]
    OpenAi,

    #[serde(rename = "Gemini")]
    #[strum(serialize = "Gemini", serialize = "gemini")]
    Gemini,

    #[serde(rename = "Hugging Face")]
    #[strum(serialize = "Hugging Face", serialize = "hf", serialize = "huggingface")]
    HuggingFace,
}

impl ApiMode {
    /// Name the backend expects in the `apiMode` field
    pub fn wire_name(&self) -> &'static str {
        match self {
            ApiMode::OpenAi => "OpenAI",
            ApiMode::Gemini => "Gemini",
            ApiMode::HuggingFace => "Hugging Face",
        }
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
