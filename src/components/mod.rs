use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::Mutation;
use crate::error::ClientError;
use crate::models::Resource;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use std::time::Instant;

pub mod dialog;
pub mod home;
pub mod hospital;
pub mod login;
pub mod table;
pub mod toast;
pub mod widgets;

/// A screen that reads the shared cache and answers keys with [`Action`]s.
pub trait Component {
    fn handle_input(&mut self, event: KeyEvent, cache: &QueryCache) -> Result<Option<Action>>;
    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache);
}

/// A resource page inside the hospital view.
pub trait Page: Component {
    /// Queries this page reads. The first one is the page's own list.
    fn resources(&self) -> &'static [Resource];

    /// True while a dialog, picker or edit buffer is taking keystrokes.
    fn captures_input(&self) -> bool;

    /// Pulls anything the page derives from the cache, such as lookup options.
    fn sync(&mut self, _cache: &QueryCache) {}

    /// Settles local state once a write this page issued has finished.
    fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>);

    fn tick(&mut self, now: Instant);
}
