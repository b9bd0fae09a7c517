use std::path::PathBuf;
use std::str::FromStr;

use crate::events::ApiMode;

use once_cell::sync::Lazy;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Toggle the free tier
    Free,
    /// Set the provider API key
    Key,
    /// Choose the provider (openai, gemini, hf)
    Mode,
    /// Toggle the custom model
    Custom,
    /// Set the custom model name
    Model,
    /// Set the reply language
    Lang,
    /// Upload a notes file as the next message
    Upload,
    /// Save the transcript as JSON
    Export,
    /// Refresh the free usage counter
    Usage,
    /// Start a new conversation
    New,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

/// Palette entries, built once
pub static COMMAND_ENTRIES: Lazy<Vec<CommandEntry>> = Lazy::new(|| {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn mode_target(&self) -> Option<ApiMode> {
        if self.command != SlashCommand::Mode {
            return None;
        }
        ApiMode::from_str(self.argument()?.trim()).ok()
    }

    pub fn path_argument(&self) -> Option<PathBuf> {
        let arg = self.argument()?.trim();
        if let Some(rest) = arg.strip_prefix("~/") {
            return dirs::home_dir().map(|home| home.join(rest));
        }
        Some(PathBuf::from(arg))
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Free => "toggle the free tier (no API key needed)",
            SlashCommand::Key => "set your API key: /key <key>",
            SlashCommand::Mode => "choose the provider: /mode <openai|gemini|hf>",
            SlashCommand::Custom => "toggle using a custom model",
            SlashCommand::Model => "set the custom model: /model <name>",
            SlashCommand::Lang => "set the reply language: /lang <language>",
            SlashCommand::Upload => "use a notes file as your message: /upload <path>",
            SlashCommand::Export => "save the transcript: /export <path>",
            SlashCommand::Usage => "refresh free usage",
            SlashCommand::New => "start a new conversation",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit duckchat",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a send is in flight.
    pub fn available_while_sending(self) -> bool {
        !matches!(self, SlashCommand::Upload | SlashCommand::New | SlashCommand::Export)
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let args: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head.to_lowercase())
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "bye" | "exit" => Some(SlashCommand::Quit),
            "h" | "?" => Some(SlashCommand::Help),
            "language" => Some(SlashCommand::Lang),
            "clear" => Some(SlashCommand::New),
            _ => None,
        })?;

    let argument = if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in COMMAND_ENTRIES.iter() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q for /quit, /h for /help, /clear for /new.");
    help
}
