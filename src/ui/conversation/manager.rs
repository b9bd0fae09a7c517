use crate::config::Config;
use crate::events::{ChatCommand, ChatEvent};
use crate::ui::conversation::{
    get_help_text, ConversationComposer, ConversationHistory, ConversationResult, FormPanel,
    ParsedCommand, SlashCommand, StatusLine,
};
use crate::usage::{send_control_enabled, UsageState};
use crate::validate::ChatForm;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone)]
pub enum ConversationAction {
    None,
    Dispatch(ChatCommand),
    Exit,
}

/// Front-end state of the chat screen.
///
/// Mirrors what the worker reports and owns the live form. The send control
/// is switched off here, synchronously, the moment a send is dispatched.
pub struct ConversationManager {
    history: ConversationHistory,
    composer: ConversationComposer,
    status: StatusLine,
    form: ChatForm,
    usage: UsageState,
    usage_label: String,
    location: String,
    in_flight: bool,
    send_enabled: bool,
    /// Set by `/key`; only then is the form's key written back
    api_key_edited: bool,
}

impl ConversationManager {
    pub fn new(config: &Config) -> Self {
        let form = ChatForm::from_config(config);

        Self {
            history: ConversationHistory::new(),
            composer: ConversationComposer::new("Ask Duck AI a question..."),
            status: StatusLine::Hidden,
            usage: UsageState::new(0, form.free_tier),
            form,
            usage_label: String::new(),
            location: String::new(),
            in_flight: false,
            send_enabled: false,
            api_key_edited: false,
        }
    }

    pub fn form(&self) -> &ChatForm {
        &self.form
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight || self.status.is_busy()
    }

    /// Copy the form settings back into `config` for saving.
    /// A key that came from the environment is left out.
    pub fn store_settings(&self, config: &mut Config) {
        if self.api_key_edited {
            let key = self.form.api_key.trim();
            config.api_key = (!key.is_empty()).then(|| key.to_string());
        }
        config.free_tier = self.form.free_tier;
        config.api_mode = self.form.api_mode;
        let model = self.form.custom_model.trim();
        config.custom_model =
            (self.form.custom_model_requested && !model.is_empty()).then(|| model.to_string());
        config.language = self.form.language.clone();
    }

    fn recompute_send_enabled(&mut self) {
        self.send_enabled =
            !self.in_flight && send_control_enabled(self.composer.content(), &self.usage);
        self.composer.set_send_enabled(self.send_enabled);
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::PageUp => {
                self.history.scroll_up(5);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(5);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ConversationResult::Submitted(text) => self.submit(text),
            ConversationResult::Command(command) => {
                let action = self.handle_slash_command(command);
                self.recompute_send_enabled();
                action
            }
            ConversationResult::Edited => {
                self.recompute_send_enabled();
                ConversationAction::None
            }
            ConversationResult::None => ConversationAction::None,
        }
    }

    /// Pasted text goes straight into the composer
    pub fn handle_paste(&mut self, text: &str) {
        self.composer.insert_str(text);
        self.recompute_send_enabled();
    }

    fn submit(&mut self, text: String) -> ConversationAction {
        if !self.send_enabled {
            return ConversationAction::None;
        }

        // Disabled before anything is awaited: this is what stops a second send.
        self.in_flight = true;
        self.send_enabled = false;
        self.composer.set_send_enabled(false);

        let mut form = self.form.clone();
        form.text = text;
        ConversationAction::Dispatch(ChatCommand::Send(form))
    }

    /// Apply an update from the chat worker
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::TurnAppended(turn) => self.history.add_turn(&turn),
            ChatEvent::Status(message) => self.status = StatusLine::Message(message),
            ChatEvent::Spinner => self.status = StatusLine::Spinner,
            ChatEvent::StatusCleared => self.status = StatusLine::Hidden,
            ChatEvent::InputCleared => self.composer.clear(),
            ChatEvent::InputReplaced(text) => self.composer.set_content(text),
            ChatEvent::SendControl(enabled) => {
                if !enabled {
                    self.send_enabled = false;
                    self.composer.set_send_enabled(false);
                    return;
                }
            }
            ChatEvent::SendIdle => self.in_flight = false,
            ChatEvent::UsageUpdated { remaining, label } => {
                self.usage.remaining = remaining;
                self.usage_label = label;
            }
            ChatEvent::LocationChanged(location) => self.location = location,
            ChatEvent::ConversationReset => {
                self.history.clear();
                self.status = StatusLine::Hidden;
            }
            ChatEvent::TranscriptLoaded(turns) => {
                for turn in &turns {
                    self.history.add_turn(turn);
                }
            }
        }
        self.recompute_send_enabled();
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if self.in_flight && !command.command.available_while_sending() {
            self.history
                .add_notice("Wait for the current reply before running that command.");
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::Free => {
                self.form.free_tier = !self.form.free_tier;
                self.usage.is_free_tier_selected = self.form.free_tier;
                ConversationAction::Dispatch(ChatCommand::SetFreeTier(self.form.free_tier))
            }
            SlashCommand::Key => {
                self.form.api_key = command.argument().unwrap_or_default().trim().to_string();
                self.api_key_edited = true;
                let notice = if self.form.api_key.is_empty() {
                    "API key cleared."
                } else {
                    "API key set."
                };
                self.history.add_notice(notice);
                ConversationAction::None
            }
            SlashCommand::Mode => {
                match command.mode_target() {
                    Some(mode) => {
                        self.form.api_mode = mode;
                        self.history.add_notice(format!("Provider set to {mode}."));
                    }
                    None => self
                        .history
                        .add_notice("Usage: /mode <openai|gemini|hf>"),
                }
                ConversationAction::None
            }
            SlashCommand::Custom => {
                self.form.custom_model_requested = !self.form.custom_model_requested;
                let state = if self.form.custom_model_requested { "on" } else { "off" };
                self.history.add_notice(format!("Custom model {state}."));
                ConversationAction::None
            }
            SlashCommand::Model => {
                match command.argument() {
                    Some(model) => {
                        self.form.custom_model = model.trim().to_string();
                        self.form.custom_model_requested = true;
                        self.history
                            .add_notice(format!("Custom model set to {}.", self.form.custom_model));
                    }
                    None => self.history.add_notice("Usage: /model <name>"),
                }
                ConversationAction::None
            }
            SlashCommand::Lang => {
                match command.argument() {
                    Some(language) => {
                        self.form.language = language.trim().to_string();
                        self.history
                            .add_notice(format!("Replies will be in {}.", self.form.language));
                    }
                    None => self.history.add_notice("Usage: /lang <language>"),
                }
                ConversationAction::None
            }
            SlashCommand::Upload => match command.path_argument() {
                Some(path) => ConversationAction::Dispatch(ChatCommand::Upload(path)),
                None => {
                    self.history.add_notice("Usage: /upload <path>");
                    ConversationAction::None
                }
            },
            SlashCommand::Export => match command.path_argument() {
                Some(path) => ConversationAction::Dispatch(ChatCommand::Export(path)),
                None => {
                    self.history.add_notice("Usage: /export <path>");
                    ConversationAction::None
                }
            },
            SlashCommand::Usage => ConversationAction::Dispatch(ChatCommand::RefreshUsage),
            SlashCommand::New => ConversationAction::Dispatch(ChatCommand::NewConversation),
            SlashCommand::Help => {
                self.history.add_notice(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    /// Render the conversation UI components
    pub fn render_conversation_ui(&self, area: Rect, buf: &mut Buffer) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(34)])
            .split(area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),                              // History
                Constraint::Length(1),                           // Status
                Constraint::Length(self.composer.desired_height()), // Composer
            ])
            .split(columns[0]);

        self.history.render(rows[0], buf);
        self.status.render(rows[1], buf);
        self.composer.render(rows[2], buf);

        FormPanel {
            form: &self.form,
            usage_label: &self.usage_label,
            location: &self.location,
        }
        .render(columns[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ConversationTurn, Role};

    fn press(manager: &mut ConversationManager, code: KeyCode) -> ConversationAction {
        manager.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            press(manager, KeyCode::Char(c));
        }
    }

    fn own_key_manager() -> ConversationManager {
        let config = Config {
            free_tier: false,
            api_key: Some("sk-test".into()),
            ..Config::default()
        };
        ConversationManager::new(&config)
    }

    #[test]
    fn send_is_disabled_until_text_is_typed() {
        let mut manager = own_key_manager();
        assert!(!manager.send_enabled());
        assert!(matches!(press(&mut manager, KeyCode::Enter), ConversationAction::None));

        type_str(&mut manager, "hi");
        assert!(manager.send_enabled());
    }

    #[test]
    fn dispatch_disables_send_synchronously() {
        let mut manager = own_key_manager();
        type_str(&mut manager, "hello");

        match press(&mut manager, KeyCode::Enter) {
            ConversationAction::Dispatch(ChatCommand::Send(form)) => {
                assert_eq!(form.text, "hello");
                assert_eq!(form.api_key, "sk-test");
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(!manager.send_enabled());

        // A second Enter while the first send is out does nothing.
        assert!(matches!(press(&mut manager, KeyCode::Enter), ConversationAction::None));

        type_str(&mut manager, "!");
        assert!(!manager.send_enabled());
    }

    #[test]
    fn worker_events_restore_the_control() {
        let mut manager = own_key_manager();
        type_str(&mut manager, "hello");
        press(&mut manager, KeyCode::Enter);

        for event in [
            ChatEvent::SendControl(false),
            ChatEvent::TurnAppended(ConversationTurn::new(Role::User, "hello")),
            ChatEvent::InputCleared,
            ChatEvent::Spinner,
            ChatEvent::TurnAppended(ConversationTurn::new(Role::Assistant, "hey")),
            ChatEvent::StatusCleared,
            ChatEvent::SendControl(false),
            ChatEvent::SendIdle,
        ] {
            manager.apply(event);
        }

        assert_eq!(manager.history.turn_count(), 2);
        assert!(!manager.is_busy());
        assert!(!manager.send_enabled());

        type_str(&mut manager, "next");
        assert!(manager.send_enabled());
    }

    #[test]
    fn blocked_send_keeps_text_and_reenables() {
        let mut manager = own_key_manager();
        type_str(&mut manager, "hello");
        press(&mut manager, KeyCode::Enter);

        manager.apply(ChatEvent::Status("Enter API key.".into()));
        manager.apply(ChatEvent::SendControl(true));
        manager.apply(ChatEvent::SendIdle);

        assert_eq!(manager.composer.content(), "hello");
        assert!(manager.send_enabled());
        assert_eq!(manager.status, StatusLine::Message("Enter API key.".into()));
    }

    #[test]
    fn exhausted_free_tier_disables_send() {
        let mut manager = ConversationManager::new(&Config::default());
        manager.apply(ChatEvent::UsageUpdated {
            remaining: 0,
            label: "0 free uses remaining today.".into(),
        });
        type_str(&mut manager, "hi");
        assert!(!manager.send_enabled());

        // Switching to an own key lifts the gate at once.
        manager.composer.clear();
        type_str(&mut manager, "/free");
        press(&mut manager, KeyCode::Esc);
        let action = press(&mut manager, KeyCode::Enter);
        assert!(matches!(
            action,
            ConversationAction::Dispatch(ChatCommand::SetFreeTier(false))
        ));
        type_str(&mut manager, "hi");
        assert!(manager.send_enabled());
    }

    #[test]
    fn settings_commands_update_the_form() {
        let mut manager = own_key_manager();
        for command in ["/mode gemini", "/model llama-3", "/lang French", "/key sk-new"] {
            type_str(&mut manager, command);
            press(&mut manager, KeyCode::Enter);
        }

        let form = manager.form();
        assert_eq!(form.api_mode, crate::events::ApiMode::Gemini);
        assert!(form.custom_model_requested);
        assert_eq!(form.custom_model, "llama-3");
        assert_eq!(form.language, "French");
        assert_eq!(form.api_key, "sk-new");

        let mut config = Config::default();
        manager.store_settings(&mut config);
        assert_eq!(config.custom_model.as_deref(), Some("llama-3"));
        assert!(!config.free_tier);
    }

    #[test]
    fn environment_key_is_not_written_back() {
        let mut config = Config {
            free_tier: false,
            ..Config::default()
        };
        config.env.api_key = Some("sk-env".into());
        let mut manager = ConversationManager::new(&config);
        assert_eq!(manager.form().api_key, "sk-env");

        type_str(&mut manager, "/lang German");
        press(&mut manager, KeyCode::Enter);
        manager.store_settings(&mut config);
        assert_eq!(config.api_key, None);
        assert_eq!(config.language, "German");

        type_str(&mut manager, "/key sk-typed");
        press(&mut manager, KeyCode::Enter);
        manager.store_settings(&mut config);
        assert_eq!(config.api_key.as_deref(), Some("sk-typed"));
    }

    #[test]
    fn uploads_wait_for_the_current_send() {
        let mut manager = own_key_manager();
        type_str(&mut manager, "hello");
        press(&mut manager, KeyCode::Enter);

        manager.composer.clear();
        type_str(&mut manager, "/upload notes.txt");
        assert!(matches!(press(&mut manager, KeyCode::Enter), ConversationAction::None));
    }
}
