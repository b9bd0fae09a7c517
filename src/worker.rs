//! Background task owning the chat session.
//!
//! The front end never touches the conversation directly: it sends
//! `ChatCommand`s and renders the `ChatEvent`s that come back. Commands are
//! handled one at a time, so a send always runs to completion before the next
//! command is looked at.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::SendController;
use crate::events::{ChatCommand, ChatEvent, ChatView};

pub struct ChatWorker<V> {
    controller: SendController,
    commands: mpsc::UnboundedReceiver<ChatCommand>,
    view: V,
    initial_transcript: Option<String>,
}

impl<V> ChatWorker<V>
where
    V: ChatView + Send + 'static,
{
    pub fn new(
        controller: SendController,
        commands: mpsc::UnboundedReceiver<ChatCommand>,
        view: V,
        initial_transcript: Option<String>,
    ) -> Self {
        Self {
            controller,
            commands,
            view,
            initial_transcript,
        }
    }

    /// Start the worker on the runtime and return its command channel
    pub fn spawn(
        controller: SendController,
        view: V,
        initial_transcript: Option<String>,
    ) -> (mpsc::UnboundedSender<ChatCommand>, JoinHandle<SendController>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self::new(controller, rx, view, initial_transcript);
        (tx, tokio::spawn(worker.run()))
    }

    /// Process commands until shutdown or until every sender is dropped.
    /// Hands the controller back so callers can inspect the final session.
    pub async fn run(mut self) -> SendController {
        // The transcript is consumed here so it can never seed twice.
        let transcript = self.initial_transcript.take();
        self.controller
            .load_transcript(transcript.as_deref(), &mut self.view);
        self.view.emit(ChatEvent::LocationChanged(
            self.controller.link().location().to_string(),
        ));
        self.controller.refresh_usage(&mut self.view).await;

        while let Some(command) = self.commands.recv().await {
            tracing::trace!(?command, "chat command");
            match command {
                ChatCommand::Send(form) => {
                    let outcome = self.controller.send(&form, &mut self.view).await;
                    tracing::info!(?outcome, turns = self.controller.session().len(), "send finished");
                }
                ChatCommand::RefreshUsage => {
                    self.controller.refresh_usage(&mut self.view).await;
                }
                ChatCommand::SetFreeTier(selected) => {
                    self.controller.set_free_tier(selected, &mut self.view).await;
                }
                ChatCommand::Upload(path) => {
                    self.controller.upload(&path, &mut self.view).await;
                }
                ChatCommand::NewConversation => {
                    self.controller.new_conversation(&mut self.view);
                }
                ChatCommand::Export(path) => {
                    self.controller.export(&path, &mut self.view).await;
                }
                ChatCommand::Shutdown => break,
            }
        }

        tracing::debug!("chat worker stopped");
        self.controller
    }
}
