mod api;
mod app;
mod cache;
mod commands;
mod components;
mod config;
mod error;
mod forms;
mod logging;
mod models;
mod session;
mod tui;

use anyhow::{Context, Result};
use api::{dispatch::Dispatcher, ApiClient};
use app::App;
use config::Config;
use crossterm::{
    event::DisableMouseCapture,
    terminal::{self, LeaveAlternateScreen},
};
use ratatui::prelude::{CrosstermBackend, Terminal};
use session::{Session, SessionStore, SessionToken};
use std::io;
use tui::Tui;

fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let token = SessionToken::default();
    let store = SessionStore::open(&config.session_db)?;
    let mut session = Session::new(store, token.clone());
    session.restore()?;

    let client = ApiClient::new(&config, token)?;
    let (dispatcher, mut outcomes) = Dispatcher::new(runtime.handle().clone(), client);

    let _guard = CleanupGuard;

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut tui = Tui::new(terminal, config.tick_rate);
    tui.init()?;

    let mut app = App::new(session);
    let res = app.run(&mut tui, &dispatcher, &mut outcomes);

    tui.exit()?;

    if let Err(e) = res {
        tracing::error!(error = %e, "application error");
        eprintln!("Application Error: {e}");
    }
    Ok(())
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}
