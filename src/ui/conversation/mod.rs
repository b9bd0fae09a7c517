//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod form;
pub mod history;
pub mod manager;
pub mod status;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::{ConversationComposer, ConversationResult};
pub use form::FormPanel;
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
pub use status::StatusLine;
