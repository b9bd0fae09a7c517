//! Terminal front end for the chat screen

pub mod conversation;

use anyhow::Result;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use crate::events::{ChatCommand, ChatEvent};
use conversation::{ConversationAction, ConversationManager};

/// Raw-mode terminal, restored on drop
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Drive the chat screen until the user quits or the worker goes away.
///
/// Key presses become commands for the worker; worker events are applied to
/// the screen as they arrive. The tick only keeps the spinner moving.
pub async fn run(
    manager: &mut ConversationManager,
    commands: &mpsc::UnboundedSender<ChatCommand>,
    events: &mut mpsc::UnboundedReceiver<ChatEvent>,
) -> Result<()> {
    let mut tui = Tui::init()?;
    let mut input = EventStream::new();
    let mut tick = interval(Duration::from_millis(150));

    loop {
        tui.terminal.draw(|frame| {
            let area = frame.size();
            manager.render_conversation_ui(area, frame.buffer_mut());
        })?;

        tokio::select! {
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => match manager.handle_key(key) {
                    ConversationAction::Dispatch(command) => {
                        if commands.send(command).is_err() {
                            tracing::warn!("chat worker is gone");
                            break;
                        }
                    }
                    ConversationAction::Exit => break,
                    ConversationAction::None => {}
                },
                Some(Ok(Event::Paste(text))) => manager.handle_paste(&text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = events.recv() => manager.apply(event),
            _ = tick.tick(), if manager.is_busy() => {}
        }
    }

    Ok(())
}
