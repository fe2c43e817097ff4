use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};

#[derive(Debug, Clone)]
pub enum Event {
    Input(event::KeyEvent),
    Tick,
}

pub type Frame<'a> = ratatui::Frame<'a>;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    framerate: f64,
}

impl Tui {
    pub fn new(terminal: Terminal<CrosstermBackend<io::Stdout>>, framerate: f64) -> Self {
        Self {
            terminal,
            framerate,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.terminal.show_cursor()?;
        terminal::disable_raw_mode()?;
        crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
        Ok(())
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Waits up to one frame for a key press. Anything else becomes a tick, so
    /// the caller can drain network results at a steady rate.
    pub fn next_event(&self) -> Result<Event> {
        let timeout = Duration::from_secs_f64(1.0 / self.framerate);

        if event::poll(timeout)? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Event::Input(key));
                }
            }
        }

        Ok(Event::Tick)
    }
}
