use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::api::{ChatBackend, DuckClient};
use crate::config::Config;
use crate::controller::{SendController, SendOutcome};
use crate::events::{ChatCommand, ChatEvent, ChatView, Role};
use crate::link::LinkSync;
use crate::session::ConversationState;
use crate::ui;
use crate::ui::conversation::form::mask_key;
use crate::ui::conversation::ConversationManager;
use crate::usage::UsageGate;
use crate::validate::ChatForm;
use crate::worker::ChatWorker;

/// Options for opening the chat screen
#[derive(Debug, Default)]
pub struct ChatOptions {
    /// Conversation to continue
    pub conversation_id: Option<String>,
    /// JSON transcript to seed the conversation with
    pub transcript: Option<PathBuf>,
    /// Override the configured free-tier choice
    pub free_tier: Option<bool>,
}

fn build_controller(
    config: &Config,
    backend: Arc<dyn ChatBackend>,
    conversation_id: Option<&str>,
) -> SendController {
    let base_url = config.server_url().trim_end_matches('/');
    let (session, link) = match conversation_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => (ConversationState::resumed(id), LinkSync::resumed(base_url, id)),
        None => (ConversationState::new(), LinkSync::new(base_url)),
    };

    SendController::new(
        backend,
        session,
        link,
        config.free_tier,
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// Open the interactive chat screen
pub async fn run_chat(mut config: Config, options: ChatOptions) -> Result<()> {
    if let Some(free_tier) = options.free_tier {
        config.free_tier = free_tier;
    }

    let transcript = match &options.transcript {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read transcript {}", path.display()))?,
        ),
        None => None,
    };

    let backend = Arc::new(DuckClient::new(&config).context("Failed to create HTTP client")?);
    let controller = build_controller(&config, backend, options.conversation_id.as_deref());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (commands, worker) = ChatWorker::spawn(controller, events_tx, transcript);

    tracing::info!(server = config.server_url(), "chat screen opened");
    let mut manager = ConversationManager::new(&config);
    let result = ui::run(&mut manager, &commands, &mut events_rx).await;

    // The worker finishes whatever command it is on before it sees this.
    let _ = commands.send(ChatCommand::Shutdown);
    drop(commands);
    match worker.await {
        Ok(controller) => {
            tracing::info!(
                turns = controller.session().len(),
                remaining = controller.usage().remaining,
                "chat screen closed"
            );
        }
        Err(e) => tracing::error!(error = %e, "chat worker panicked"),
    }

    manager.store_settings(&mut config);
    config.save()?;

    result
}

/// Prints worker events for a one-shot send
struct ConsoleView;

impl ChatView for ConsoleView {
    fn emit(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::TurnAppended(turn) if turn.role == Role::Assistant => {
                println!("{}", turn.content);
            }
            ChatEvent::Status(message) => eprintln!("{message}"),
            ChatEvent::LocationChanged(location) => {
                tracing::info!(%location, "conversation stored");
            }
            _ => {}
        }
    }
}

/// Send one message and print the reply
pub async fn ask(config: Config, message: &str, free_tier: Option<bool>) -> Result<()> {
    let mut form = ChatForm::from_config(&config);
    form.text = message.to_string();
    if let Some(free_tier) = free_tier {
        form.free_tier = free_tier;
    }

    let backend = Arc::new(DuckClient::new(&config).context("Failed to create HTTP client")?);
    let mut controller = build_controller(&config, backend, None);
    let mut view = ConsoleView;

    controller.set_free_tier(form.free_tier, &mut view).await;
    match controller.send(&form, &mut view).await {
        SendOutcome::Rendered => Ok(()),
        SendOutcome::Blocked(reason) => anyhow::bail!("Message not sent: {reason}"),
        SendOutcome::Failed => anyhow::bail!("No reply from {}", config.server_url()),
    }
}

/// Print the free usage counter
pub async fn usage(config: &Config) -> Result<()> {
    let client = DuckClient::new(config).context("Failed to create HTTP client")?;
    let mut gate = UsageGate::new(true);
    gate.refresh(&client).await;
    println!("{}", gate.label());
    Ok(())
}

/// Changes requested by `duckchat config`
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub show: bool,
    pub api_key: Option<String>,
    pub server: Option<String>,
    pub session: Option<String>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.server.is_none() && self.session.is_none()
    }

    fn apply(self, config: &mut Config) {
        if let Some(key) = self.api_key {
            config.set_api_key(key);
        }
        if let Some(server) = self.server {
            config.server = Some(server);
        }
        if let Some(session) = self.session {
            config.session = Some(session);
        }
    }
}

pub fn configure(mut config: Config, update: ConfigUpdate) -> Result<()> {
    let show = update.show || update.is_empty();
    if !update.is_empty() {
        update.apply(&mut config);
        config.save()?;
        println!("Saved {}", config.config_path().display());
    }

    if show {
        println!("server:     {}", config.server_url());
        let key = match config.api_key() {
            Some(key) => mask_key(key),
            None => "(not set)".to_string(),
        };
        println!("api key:    {key}");
        println!("provider:   {}", config.api_mode);
        println!(
            "model:      {}",
            config.custom_model.as_deref().unwrap_or("default")
        );
        println!("language:   {}", config.language);
        println!("free tier:  {}", if config.free_tier { "on" } else { "off" });
        println!(
            "logged in:  {}",
            if config.session_cookie().is_some() { "yes" } else { "no" }
        );
        println!("config:     {}", config.config_path().display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MockBackend;

    #[test]
    fn resumed_controller_points_at_the_conversation() {
        let config = Config {
            server: Some("http://duck.test/".into()),
            ..Config::default()
        };
        let controller = build_controller(&config, Arc::new(MockBackend::new()), Some("abc"));
        assert_eq!(controller.session().conversation_id(), Some("abc"));
        assert!(controller.link().location().ends_with("abc"));

        let fresh = build_controller(&config, Arc::new(MockBackend::new()), Some("  "));
        assert_eq!(fresh.session().conversation_id(), None);
        assert_eq!(fresh.link().location(), "http://duck.test/duck-ai");
    }

    #[test]
    fn config_update_only_touches_given_fields() {
        let mut config = Config {
            api_key: Some("sk-old".into()),
            ..Config::default()
        };
        let update = ConfigUpdate {
            server: Some("http://other:5000".into()),
            ..ConfigUpdate::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut config);
        assert_eq!(config.server.as_deref(), Some("http://other:5000"));
        assert_eq!(config.api_key.as_deref(), Some("sk-old"));
    }
}
