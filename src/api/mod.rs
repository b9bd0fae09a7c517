//! Chat backend seam: wire types, the backend trait and its HTTP client

pub mod client;
pub mod error;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::events::{ApiMode, ConversationTurn};

pub use client::DuckClient;
pub use error::{ApiError, ApiErrorKind};

/// Body of the generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Prompt history window, `role: content` lines
    pub message: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_mode: ApiMode,
    pub is_free: bool,
    pub language: String,
}

/// Body of the conversation store request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRequest {
    pub messages: Vec<ConversationTurn>,
    #[serde(rename = "queryID")]
    pub query_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoreResponse {
    #[serde(rename = "queryID", default)]
    pub query_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Read `remaining` leniently: absent, non-numeric or negative means 0.
/// Whole floats such as `3.0` count; fractions are truncated.
pub(crate) fn remaining_from(body: &serde_json::Value) -> u32 {
    let Some(value) = body.get("remaining") else {
        return 0;
    };
    if let Some(n) = value.as_i64() {
        return u32::try_from(n.max(0)).unwrap_or(u32::MAX);
    }
    match value.as_f64() {
        Some(n) if n.is_finite() => n.clamp(0.0, f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

/// Everything the chat session needs from the server
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Free uses left today
    async fn fetch_usage(&self) -> Result<u32, ApiError>;

    /// Generate the assistant reply, untrimmed
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ApiError>;

    /// Persist an exchange; returns the conversation id the server used
    async fn store_conversation(&self, request: &StoreRequest) -> Result<Option<String>, ApiError>;

    /// Extract notes text from an uploaded file
    async fn upload_notes(&self, file_name: &str, bytes: Vec<u8>) -> Result<Option<String>, ApiError>;

    /// Whether a logged-in session is attached to requests
    fn is_authenticated(&self) -> bool;
}
