use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod api;
mod commands;
mod config;
mod controller;
mod events;
mod link;
mod logging;
mod session;
mod ui;
mod usage;
mod validate;
mod worker;

use commands::{ChatOptions, ConfigUpdate};
use config::Config;

#[derive(Parser)]
#[command(name = "duckchat")]
#[command(version = "0.1.0")]
#[command(about = "Terminal client for Duck AI conversations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(Args, Default)]
struct ChatArgs {
    /// Continue the conversation with this id
    #[arg(long)]
    id: Option<String>,

    /// Seed the conversation from a JSON transcript
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Use the free tier
    #[arg(long, conflicts_with = "no_free")]
    free: bool,

    /// Use your own API key instead of the free tier
    #[arg(long)]
    no_free: bool,
}

impl ChatArgs {
    fn free_tier(&self) -> Option<bool> {
        match (self.free, self.no_free) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (the default)
    Chat(ChatArgs),
    /// Send a single message and print the reply
    Ask {
        #[arg(required = true)]
        message: Vec<String>,

        #[arg(long, conflicts_with = "no_free")]
        free: bool,

        #[arg(long)]
        no_free: bool,
    },
    /// Show how many free uses are left today
    Usage,
    /// Show or change saved settings
    Config {
        #[arg(long)]
        show: bool,

        /// Provider API key to save
        #[arg(long = "set-key")]
        set_key: Option<String>,

        /// Server base URL
        #[arg(long)]
        server: Option<String>,

        /// Value of the server's session cookie
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init(&config.log_path())?;

    match cli.command {
        None => run_chat(config, cli.chat).await,
        Some(Commands::Chat(args)) => run_chat(config, args).await,
        Some(Commands::Ask {
            message,
            free,
            no_free,
        }) => {
            let free_tier = ChatArgs {
                free,
                no_free,
                ..ChatArgs::default()
            }
            .free_tier();
            commands::ask(config, &message.join(" "), free_tier).await
        }
        Some(Commands::Usage) => commands::usage(&config).await,
        Some(Commands::Config {
            show,
            set_key,
            server,
            session,
        }) => commands::configure(
            config,
            ConfigUpdate {
                show,
                api_key: set_key,
                server,
                session,
            },
        ),
    }
}

async fn run_chat(config: Config, args: ChatArgs) -> Result<()> {
    let free_tier = args.free_tier();
    commands::run_chat(
        config,
        ChatOptions {
            conversation_id: args.id,
            transcript: args.transcript,
            free_tier,
        },
    )
    .await
}
