use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::multipart;
use tokio::time::Duration;

use super::{
    remaining_from, ApiError, ChatBackend, GenerateRequest, GenerateResponse, StoreRequest,
    StoreResponse, UploadResponse,
};
use crate::config::Config;

/// HTTP client for the Duck AI backend
#[derive(Clone)]
pub struct DuckClient {
    client: reqwest::Client,
    base_url: String,
    authenticated: bool,
}

impl DuckClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let session = config.session_cookie();
        if let Some(session) = &session {
            let value = HeaderValue::from_str(&format!("session={session}"))
                .map_err(|e| ApiError::invalid_request(format!("Invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url().trim_end_matches('/').to_string(),
            authenticated: session.is_some(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success status into an error carrying the body
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::status(
            status.as_u16(),
            format!("{} {}", status, body.trim()),
        ))
    }
}

#[async_trait]
impl ChatBackend for DuckClient {
    async fn fetch_usage(&self) -> Result<u32, ApiError> {
        let response = self.client.get(self.url("/get-usage")).send().await?;
        let body: serde_json::Value = Self::check(response).await?.json().await?;
        Ok(remaining_from(&body))
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ApiError> {
        tracing::debug!(
            api_mode = %request.api_mode,
            is_free = request.is_free,
            prompt_chars = request.message.len(),
            "requesting generation"
        );
        let response = self
            .client
            .post(self.url("/duck-ai/generate"))
            .json(request)
            .send()
            .await?;
        let body: GenerateResponse = Self::check(response).await?.json().await?;
        Ok(body.response)
    }

    async fn store_conversation(&self, request: &StoreRequest) -> Result<Option<String>, ApiError> {
        let response = self
            .client
            .post(self.url("/duck-ai/store-conversation"))
            .json(request)
            .send()
            .await?;
        let body: StoreResponse = Self::check(response).await?.json().await?;
        Ok(body.query_id.filter(|id| !id.is_empty()))
    }

    async fn upload_notes(&self, file_name: &str, bytes: Vec<u8>) -> Result<Option<String>, ApiError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("notesFile", part);
        let response = self
            .client
            .post(self.url("/upload-notes"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::check(response).await?.json().await?;
        Ok(body.notes)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slash() {
        let mut config = Config::default();
        config.server = Some("http://localhost:5000/".into());
        let client = DuckClient::new(&config).unwrap();
        assert_eq!(client.url("/get-usage"), "http://localhost:5000/get-usage");
    }

    #[test]
    fn session_cookie_marks_client_authenticated() {
        let mut config = Config::default();
        assert!(!DuckClient::new(&config).unwrap().is_authenticated());

        config.session = Some("abc123".into());
        assert!(DuckClient::new(&config).unwrap().is_authenticated());
    }

    #[test]
    fn rejects_cookie_with_control_characters() {
        let mut config = Config::default();
        config.session = Some("bad\nvalue".into());
        assert!(DuckClient::new(&config).is_err());
    }
}
