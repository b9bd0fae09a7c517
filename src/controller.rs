//! Orchestration of a single chat send, plus the other session actions

use std::path::Path;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{ApiError, ChatBackend, GenerateRequest, StoreRequest};
use crate::events::{ApiMode, ChatEvent, ChatView, Role};
use crate::link::LinkSync;
use crate::session::ConversationState;
use crate::usage::{send_control_enabled, UsageGate, UsageState};
use crate::validate::{validate, ChatForm};

pub const QUOTA_EXHAUSTED: &str = "No free uses left today.";
pub const GENERATION_FAILED: &str = "Error while generating response.";
pub const UPLOAD_FAILED: &str = "File upload failed.";

/// Where the controller is within one send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Validating,
    Blocked,
    Sending,
    Rendered,
    Failed,
}

/// How a send ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was sent; the message says why
    Blocked(&'static str),
    /// The assistant reply was appended
    Rendered,
    /// The generation call failed or timed out
    Failed,
}

/// Owns the conversation and drives every send through its phases
pub struct SendController {
    backend: Arc<dyn ChatBackend>,
    session: ConversationState,
    usage: UsageGate,
    link: LinkSync,
    phase: SendPhase,
    generate_timeout: Duration,
}

impl SendController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        session: ConversationState,
        link: LinkSync,
        free_tier: bool,
        generate_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            usage: UsageGate::new(free_tier),
            link,
            phase: SendPhase::Idle,
            generate_timeout,
        }
    }

    pub fn session(&self) -> &ConversationState {
        &self.session
    }

    pub fn usage(&self) -> UsageState {
        self.usage.state()
    }

    pub fn link(&self) -> &LinkSync {
        &self.link
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    fn transition(&mut self, next: SendPhase) {
        tracing::debug!(from = ?self.phase, to = ?next, "send phase");
        self.phase = next;
    }

    /// Seed the conversation from a saved transcript and show it
    pub fn load_transcript(&mut self, raw: Option<&str>, view: &mut impl ChatView) -> usize {
        let count = self.session.seed_from_transcript(raw);
        if count > 0 {
            view.emit(ChatEvent::TranscriptLoaded(self.session.turns().to_vec()));
        }
        count
    }

    /// Run one send action from the given form state
    pub async fn send(&mut self, form: &ChatForm, view: &mut impl ChatView) -> SendOutcome {
        let span = tracing::info_span!("send", send_id = %Uuid::new_v4());
        self.run_send(form, view).instrument(span).await
    }

    async fn run_send(&mut self, form: &ChatForm, view: &mut impl ChatView) -> SendOutcome {
        self.usage.set_free_tier(form.free_tier);

        if !self.usage.is_send_allowed() {
            return self.block(QUOTA_EXHAUSTED, &form.text, view);
        }

        self.transition(SendPhase::Validating);
        let status = validate(&form.snapshot(), form.free_tier);
        if !status.is_ready() {
            return self.block(status.message(), &form.text, view);
        }

        self.transition(SendPhase::Sending);
        view.emit(ChatEvent::SendControl(false));

        let text = form.text.trim().to_string();
        let turn = self.session.append_turn(Role::User, text).clone();
        view.emit(ChatEvent::TurnAppended(turn));
        view.emit(ChatEvent::InputCleared);
        view.emit(ChatEvent::Spinner);

        let request = self.generate_request(form);
        let outcome = match self.generate(&request).await {
            Ok(reply) => {
                let turn = self
                    .session
                    .append_turn(Role::Assistant, reply.trim())
                    .clone();
                view.emit(ChatEvent::TurnAppended(turn));
                view.emit(ChatEvent::StatusCleared);
                self.transition(SendPhase::Rendered);

                self.persist(view).await;

                if form.free_tier {
                    let remaining = self.refresh_usage(view).await;
                    if remaining == 0 {
                        tracing::info!("free uses exhausted, send disabled");
                    }
                }
                SendOutcome::Rendered
            }
            Err(err) => {
                tracing::error!(kind = ?err.kind, error = %err, "generation failed");
                self.transition(SendPhase::Failed);
                view.emit(ChatEvent::Status(GENERATION_FAILED.to_string()));
                SendOutcome::Failed
            }
        };

        // The input was consumed by this send.
        self.settle("", view);
        outcome
    }

    fn block(&mut self, message: &'static str, text: &str, view: &mut impl ChatView) -> SendOutcome {
        tracing::debug!(reason = message, "send blocked");
        self.transition(SendPhase::Blocked);
        view.emit(ChatEvent::Status(message.to_string()));
        self.settle(text, view);
        SendOutcome::Blocked(message)
    }

    /// Restore the send control from the current input and usage
    fn settle(&mut self, text: &str, view: &mut impl ChatView) {
        let enabled = send_control_enabled(text, &self.usage.state());
        view.emit(ChatEvent::SendControl(enabled));
        self.transition(SendPhase::Idle);
        view.emit(ChatEvent::SendIdle);
    }

    fn generate_request(&self, form: &ChatForm) -> GenerateRequest {
        let free = form.free_tier;
        GenerateRequest {
            message: self.session.history_window(),
            api_key: (!free).then(|| form.api_key.trim().to_string()),
            model: if free { None } else { form.model() },
            api_mode: if free { ApiMode::OpenAi } else { form.api_mode },
            is_free: free,
            language: form.language.trim().to_string(),
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ApiError> {
        match tokio::time::timeout(self.generate_timeout, self.backend.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::timeout(format!(
                "no reply within {}s",
                self.generate_timeout.as_secs()
            ))),
        }
    }

    /// Store the latest exchange. Failures are logged and otherwise ignored.
    async fn persist(&mut self, view: &mut impl ChatView) {
        if !self.backend.is_authenticated() {
            tracing::debug!("not logged in, conversation not stored");
            return;
        }
        let Some(exchange) = self.session.latest_exchange() else {
            return;
        };
        let request = StoreRequest {
            messages: exchange.to_vec(),
            query_id: self.session.conversation_id().map(str::to_string),
        };

        match self.backend.store_conversation(&request).await {
            Ok(Some(id)) => {
                if self.session.adopt_conversation_id(&id) {
                    if let Some(location) = self.link.sync(&id) {
                        view.emit(ChatEvent::LocationChanged(location.to_string()));
                    }
                }
            }
            Ok(None) => tracing::debug!("store returned no conversation id"),
            Err(err) => tracing::warn!(error = %err, "failed to store conversation"),
        }
    }

    /// Re-read the usage counter and report it
    pub async fn refresh_usage(&mut self, view: &mut impl ChatView) -> u32 {
        let remaining = self.usage.refresh(self.backend.as_ref()).await;
        view.emit(ChatEvent::UsageUpdated {
            remaining,
            label: self.usage.label().to_string(),
        });
        remaining
    }

    pub async fn set_free_tier(&mut self, selected: bool, view: &mut impl ChatView) {
        self.usage.set_free_tier(selected);
        if selected {
            self.refresh_usage(view).await;
        }
    }

    /// Upload a notes file; its text replaces the composer input
    pub async fn upload(&mut self, path: &Path, view: &mut impl ChatView) {
        view.emit(ChatEvent::Spinner);
        let result = self.upload_file(path).await;
        view.emit(ChatEvent::StatusCleared);

        match result {
            Ok(Some(notes)) => {
                let enabled = send_control_enabled(&notes, &self.usage.state());
                view.emit(ChatEvent::InputReplaced(notes));
                view.emit(ChatEvent::SendControl(enabled));
            }
            Ok(None) => {
                tracing::warn!(path = %path.display(), "upload returned no notes");
                view.emit(ChatEvent::Status(UPLOAD_FAILED.to_string()));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "upload failed");
                view.emit(ChatEvent::Status(UPLOAD_FAILED.to_string()));
            }
        }
    }

    async fn upload_file(&self, path: &Path) -> Result<Option<String>, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notes.txt".to_string());
        self.backend.upload_notes(&file_name, bytes).await
    }

    /// Drop the conversation and start over on the bare chat page
    pub fn new_conversation(&mut self, view: &mut impl ChatView) {
        self.session = ConversationState::new();
        self.link.reset();
        self.transition(SendPhase::Idle);
        view.emit(ChatEvent::ConversationReset);
        view.emit(ChatEvent::LocationChanged(self.link.location().to_string()));
    }

    /// Write the transcript to `path`
    pub async fn export(&self, path: &Path, view: &mut impl ChatView) {
        match self.session.export_to(path).await {
            Ok(()) => view.emit(ChatEvent::Status(format!(
                "Transcript saved to {}",
                path.display()
            ))),
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                view.emit(ChatEvent::Status("Export failed.".to_string()));
            }
        }
    }
}
