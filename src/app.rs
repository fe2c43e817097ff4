//! The main application state and logic for Rustoria.
//!
//! Screens turn keys into [`Action`]s. Anything that needs the network becomes
//! a [`Command`] in the outbox; the run loop hands those to the dispatcher and
//! feeds the resulting [`Outcome`]s back in on later frames.

use crate::api::dispatch::Dispatcher;
use crate::cache::QueryCache;
use crate::commands::{Command, Outcome};
use crate::components::hospital::HospitalApp;
use crate::components::{home::Home, login::Login, Component};
use crate::models::Resource;
use crate::session::Session;
use crate::tui::{Event, Frame, Tui};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// What a screen asks the app to do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login { username: String, password: String },
    Open(Resource),
    /// Back to the dashboard.
    Back,
    Logout,
    Quit,
    Request(Command),
    /// Mark a list stale so it is fetched again.
    Refresh(Resource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Login,
    Home,
    Running(Resource),
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    login: Login,
    home: Home,
    hospital: HospitalApp,
    cache: QueryCache,
    session: Session,
    outbox: Vec<Command>,
}

impl App {
    /// Starts on the dashboard when a stored session was restored.
    pub fn new(session: Session) -> Self {
        let mut home = Home::new();
        home.set_username(session.username().map(str::to_string));
        Self {
            state: if session.is_active() {
                AppState::Home
            } else {
                AppState::Login
            },
            should_quit: false,
            login: Login::new(),
            home,
            hospital: HospitalApp::new(),
            cache: QueryCache::new(),
            session,
            outbox: Vec::new(),
        }
    }

    /// Runs the application's main loop.
    pub fn run(
        &mut self,
        tui: &mut Tui,
        dispatcher: &Dispatcher,
        outcomes: &mut UnboundedReceiver<Outcome>,
    ) -> Result<()> {
        while !self.should_quit {
            self.sync();
            for command in self.take_commands() {
                dispatcher.dispatch(command);
            }

            tui.draw(|frame| self.render(frame))?;

            match tui.next_event()? {
                Event::Input(key) => self.handle_key(key)?,
                Event::Tick => self.tick(Instant::now()),
            }

            while let Ok(outcome) = outcomes.try_recv() {
                self.apply_outcome(outcome)?;
            }
        }
        tracing::info!("shutting down");
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Global keybinding: Ctrl+Q to quit
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        let action = match self.state {
            AppState::Login => self.login.handle_input(key, &self.cache)?,
            AppState::Home => self.home.handle_input(key, &self.cache)?,
            AppState::Running(_) => self.hospital.handle_input(key, &self.cache)?,
        };
        if let Some(action) = action {
            self.perform(action)?;
        }
        Ok(())
    }

    fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Login { username, password } => {
                tracing::info!(%username, "signing in");
                self.outbox.push(Command::Login { username, password });
            }
            Action::Open(resource) => self.open(resource, Instant::now()),
            Action::Back => {
                self.state = AppState::Home;
                let now = Instant::now();
                for resource in Resource::ALL {
                    self.cache.mount(resource, now);
                }
            }
            Action::Logout => self.logout()?,
            Action::Quit => self.should_quit = true,
            Action::Request(command) => {
                if let Some(mutation) = command.mutation() {
                    tracing::debug!(?mutation, "queueing mutation");
                }
                self.outbox.push(command);
            }
            Action::Refresh(resource) => self.cache.invalidate(resource),
        }
        Ok(())
    }

    fn open(&mut self, resource: Resource, now: Instant) {
        self.state = AppState::Running(resource);
        self.hospital.open(resource);
        for resource in self.hospital.resources() {
            self.cache.mount(*resource, now);
        }
    }

    /// Queues a fetch for every query the current screen reads that is
    /// missing or stale.
    pub fn sync(&mut self) {
        let resources: &[Resource] = match self.state {
            AppState::Login => &[],
            AppState::Home => &Resource::ALL,
            AppState::Running(_) => {
                self.hospital.sync(&self.cache);
                self.hospital.resources()
            }
        };
        for &resource in resources {
            if self.cache.needs_fetch(resource) {
                let seq = self.cache.begin_fetch(resource);
                self.outbox.push(Command::Fetch { resource, seq });
            }
        }
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    pub fn tick(&mut self, now: Instant) {
        self.login.check_error_timeout(now);
        self.hospital.tick(now);
    }

    pub fn apply_outcome(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::LoggedIn { username, result } => match result {
                Ok(token) => {
                    self.session.begin(username, token)?;
                    self.login.reset();
                    self.home
                        .set_username(self.session.username().map(str::to_string));
                    self.state = AppState::Home;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "login failed");
                    self.login.fail(err.to_string());
                }
            },
            Outcome::Fetched {
                resource,
                seq,
                result,
            } => {
                if matches!(&result, Err(err) if err.is_unauthorized()) {
                    return self.expire_session();
                }
                self.cache.complete(resource, seq, result, Instant::now());
            }
            Outcome::Mutated { mutation, result } => {
                if matches!(&result, Err(err) if err.is_unauthorized()) {
                    return self.expire_session();
                }
                if result.is_ok() {
                    self.cache.invalidate(mutation.resource);
                }
                self.hospital.on_mutation(&mutation, &result);
            }
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.session.end()?;
        self.cache.clear();
        self.outbox.clear();
        self.hospital = HospitalApp::new();
        self.home = Home::new();
        self.login.reset();
        self.state = AppState::Login;
        Ok(())
    }

    fn expire_session(&mut self) -> Result<()> {
        if !self.session.is_active() {
            return Ok(());
        }
        tracing::warn!("server rejected the session token");
        self.logout()?;
        self.login.notify(SESSION_EXPIRED_MESSAGE.to_string());
        Ok(())
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        match self.state {
            AppState::Login => self.login.render(frame, area, &self.cache),
            AppState::Home => self.home.render(frame, area, &self.cache),
            AppState::Running(_) => self.hospital.render(frame, area, &self.cache),
        }
    }
}
