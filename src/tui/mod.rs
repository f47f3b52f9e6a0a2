// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod app;
pub mod event;
pub mod ui;
pub mod widgets;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;

use crate::api::BackendClient;
use crate::config::Config;

pub use app::App;
pub use event::{Event, EventHandler};

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    pub event_handler: EventHandler,
}

impl Tui {
    pub fn new(tick_rate_ms: u64) -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        let event_handler = EventHandler::new(tick_rate_ms);
        Ok(Self {
            terminal,
            event_handler,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    pub fn draw(&mut self, app: &mut App) -> Result<()> {
        self.terminal.draw(|frame| ui::draw(frame, app))?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

pub async fn run_tui(config: Config, client: BackendClient) -> Result<()> {
    let mut tui = Tui::new(config.ui.tick_rate_ms)?;
    tui.init()?;

    let mut app = App::new(config, client);
    let res = run_app(&mut tui, &mut app).await;

    // Release the player before leaving the alternate screen.
    app.playback.shutdown();

    tui.exit()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app(tui: &mut Tui, app: &mut App) -> Result<()> {
    // Paint the empty frame, then do the initial load so the loading
    // overlay has something underneath it.
    tui.draw(app)?;
    app.load_all().await;
    tui.draw(app)?;

    loop {
        let event = tokio::time::timeout(app.tick_timeout(), tui.event_handler.next()).await;

        let should_redraw = match event {
            Ok(Ok(Event::Key(key_event))) => match app.handle_key_event(key_event).await {
                Some(app::Action::Quit) => break,
                None => true,
            },
            Ok(Ok(Event::Resize(_, _))) => true,
            Ok(Ok(Event::Tick)) | Err(_) => {
                // Expire toasts and watch the player.
                let expired = app.tick();
                let playback_changed = app.poll_playback().await;
                expired || playback_changed
            }
            Ok(Err(e)) => return Err(e),
        };

        if should_redraw {
            tui.draw(app)?;
        }
    }

    Ok(())
}
