//! Conversation link kept in step with the server-assigned id

/// Path of the chat page on the server
pub const CHAT_PATH: &str = "/duck-ai";

/// Tracks the shareable link of the current conversation.
///
/// The link gains its `?id=` exactly once per session.
#[derive(Debug, Clone)]
pub struct LinkSync {
    base_url: String,
    location: String,
    synced: bool,
}

impl LinkSync {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            location: format!("{base_url}{CHAT_PATH}"),
            base_url,
            synced: false,
        }
    }

    /// A session opened on an existing conversation starts out synced
    pub fn resumed(base_url: &str, conversation_id: &str) -> Self {
        let mut link = Self::new(base_url);
        link.location = link.conversation_url(conversation_id);
        link.synced = true;
        link
    }

    /// Back to the bare chat page, ready to sync a new conversation
    pub fn reset(&mut self) {
        *self = Self::new(&self.base_url);
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn conversation_url(&self, conversation_id: &str) -> String {
        format!(
            "{}{}?id={}",
            self.base_url,
            CHAT_PATH,
            urlencoding::encode(conversation_id)
        )
    }

    /// Point the link at `conversation_id`.
    ///
    /// Returns the new location the first time only; later calls are ignored.
    pub fn sync(&mut self, conversation_id: &str) -> Option<&str> {
        if self.synced {
            return None;
        }
        self.location = self.conversation_url(conversation_id);
        self.synced = true;
        tracing::info!(location = %self.location, "conversation link updated");
        Some(&self.location)
    }
}
