//! In-memory backend for driving the chat session in tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Duration;

use super::{ApiError, ChatBackend, GenerateRequest, StoreRequest};

pub struct MockBackend {
    usage: Mutex<Result<u32, ApiError>>,
    generate: Mutex<Result<String, ApiError>>,
    generate_delay: Option<Duration>,
    store: Mutex<VecDeque<Result<Option<String>, ApiError>>>,
    upload: Mutex<Result<Option<String>, ApiError>>,
    authenticated: bool,
    pub usage_calls: Mutex<usize>,
    pub generate_calls: Mutex<Vec<GenerateRequest>>,
    pub store_calls: Mutex<Vec<StoreRequest>>,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            usage: Mutex::new(Ok(0)),
            generate: Mutex::new(Ok(String::new())),
            generate_delay: None,
            store: Mutex::new(VecDeque::new()),
            upload: Mutex::new(Ok(None)),
            authenticated: false,
            usage_calls: Mutex::new(0),
            generate_calls: Mutex::new(Vec::new()),
            store_calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_usage(self, usage: Result<u32, ApiError>) -> Self {
        self.set_usage(usage);
        self
    }

    pub fn set_usage(&self, usage: Result<u32, ApiError>) {
        *self.usage.lock().unwrap() = usage;
    }

    pub fn with_reply(self, reply: Result<&str, ApiError>) -> Self {
        *self.generate.lock().unwrap() = reply.map(str::to_string);
        self
    }

    pub fn with_generate_delay(mut self, delay: Duration) -> Self {
        self.generate_delay = Some(delay);
        self
    }

    /// Queue a store response; unqueued calls answer `Ok(None)`
    pub fn with_store(self, response: Result<Option<&str>, ApiError>) -> Self {
        self.store
            .lock()
            .unwrap()
            .push_back(response.map(|id| id.map(str::to_string)));
        self
    }

    pub fn with_upload(self, response: Result<Option<&str>, ApiError>) -> Self {
        *self.upload.lock().unwrap() = response.map(|notes| notes.map(str::to_string));
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn fetch_usage(&self) -> Result<u32, ApiError> {
        *self.usage_calls.lock().unwrap() += 1;
        self.usage.lock().unwrap().clone()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ApiError> {
        self.generate_calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.generate_delay {
            tokio::time::sleep(delay).await;
        }
        self.generate.lock().unwrap().clone()
    }

    async fn store_conversation(&self, request: &StoreRequest) -> Result<Option<String>, ApiError> {
        self.store_calls.lock().unwrap().push(request.clone());
        self.store.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn upload_notes(&self, file_name: &str, bytes: Vec<u8>) -> Result<Option<String>, ApiError> {
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes));
        self.upload.lock().unwrap().clone()
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
