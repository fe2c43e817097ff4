//! Hospital management view.
//!
//! Owns one page per resource and a tab bar. Number keys switch pages unless
//! the active page is taking text input.

use super::table::{RowCursor, RowEditor};
use super::toast::Notifier;
use super::widgets::{fill_background, form_lines, panel, render_error_banner, render_header, render_help, BORDER, HIGHLIGHT, TEXT};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::{Command, Mutation};
use crate::components::{Component, Page};
use crate::error::{ClientError, FieldErrors};
use crate::forms::Form;
use crate::models::{Patch, RecordId, Resource};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::Instant;

pub mod appointments;
pub mod doctors;
pub mod queue;
pub mod users;

use appointments::AppointmentsPage;
use doctors::DoctorsPage;
use queue::QueuePage;
use users::UsersPage;

pub struct HospitalApp {
    active: Resource,
    queue: QueuePage,
    appointments: AppointmentsPage,
    doctors: DoctorsPage,
    users: UsersPage,
}

impl Default for HospitalApp {
    fn default() -> Self {
        Self::new()
    }
}

impl HospitalApp {
    pub fn new() -> Self {
        Self {
            active: Resource::Queue,
            queue: QueuePage::new(),
            appointments: AppointmentsPage::new(),
            doctors: DoctorsPage::new(),
            users: UsersPage::new(),
        }
    }

    pub fn active(&self) -> Resource {
        self.active
    }

    pub fn open(&mut self, resource: Resource) {
        self.active = resource;
    }

    fn page(&self, resource: Resource) -> &dyn Page {
        match resource {
            Resource::Queue => &self.queue,
            Resource::Appointments => &self.appointments,
            Resource::Doctors => &self.doctors,
            Resource::Users => &self.users,
        }
    }

    fn page_mut(&mut self, resource: Resource) -> &mut dyn Page {
        match resource {
            Resource::Queue => &mut self.queue,
            Resource::Appointments => &mut self.appointments,
            Resource::Doctors => &mut self.doctors,
            Resource::Users => &mut self.users,
        }
    }

    /// Queries the active page reads.
    pub fn resources(&self) -> &'static [Resource] {
        self.page(self.active).resources()
    }

    pub fn sync(&mut self, cache: &QueryCache) {
        self.page_mut(self.active).sync(cache);
    }

    pub fn tick(&mut self, now: Instant) {
        for resource in Resource::ALL {
            self.page_mut(resource).tick(now);
        }
    }

    /// Routes a finished write to the page that owns the resource.
    pub fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>) {
        self.page_mut(mutation.resource).on_mutation(mutation, result);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Resource::ALL
            .iter()
            .enumerate()
            .map(|(i, r)| Line::from(format!("{} {}", i + 1, r.title())))
            .collect();
        let selected = Resource::ALL.iter().position(|r| *r == self.active);
        let tabs = Tabs::new(titles)
            .select(selected.unwrap_or(0))
            .style(Style::default().fg(TEXT))
            .highlight_style(Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD))
            .divider(Span::styled("|", Style::default().fg(BORDER)));
        frame.render_widget(tabs, area);
    }
}

impl Component for HospitalApp {
    fn handle_input(&mut self, event: KeyEvent, cache: &QueryCache) -> Result<Option<Action>> {
        let page = self.page_mut(self.active);
        if !page.captures_input() {
            match event.code {
                KeyCode::Char(c @ '1'..='4') => {
                    let index = c as usize - '1' as usize;
                    return Ok(Some(Action::Open(Resource::ALL[index])));
                }
                KeyCode::Esc | KeyCode::Char('b') => return Ok(Some(Action::Back)),
                _ => {}
            }
        }
        page.handle_input(event, cache)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        fill_background(frame, area);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        self.render_tabs(frame, layout[0]);
        self.page(self.active).render(frame, layout[1], cache);
    }
}

/// Regions every resource page draws into.
pub(super) struct PageLayout {
    pub header: Rect,
    pub banner: Rect,
    pub body: Rect,
    pub toast: Rect,
    pub help: Rect,
}

impl PageLayout {
    pub fn new(area: Rect) -> Self {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(1), // Read error banner
                Constraint::Min(5),    // Table
                Constraint::Length(1), // Toast
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(area);
        Self {
            header: layout[0],
            banner: layout[1],
            body: layout[2],
            toast: layout[3],
            help: layout[4],
        }
    }

    /// Header, banner, toast and help. The caller draws the body.
    pub fn render_chrome(
        &self,
        frame: &mut Frame,
        title: &str,
        read_error: Option<&str>,
        notifier: &Notifier,
        help: &str,
    ) {
        render_header(frame, self.header, title);
        if let Some(message) = read_error {
            render_error_banner(frame, self.banner, message);
        }
        notifier.render(frame, self.toast);
        render_help(frame, self.help, help);
    }
}

/// Splits the body into table and edit panel when a row is being edited.
pub(super) fn split_for_editor(body: Rect, editor: &RowEditor<Form>) -> (Rect, Option<Rect>) {
    let Some(form) = editor.buffer() else {
        return (body, None);
    };
    let height = form.schema().len() as u16 * 2 + 2;
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(height)])
        .split(body);
    (layout[0], Some(layout[1]))
}

pub(super) fn render_edit_panel(frame: &mut Frame, area: Rect, editor: &RowEditor<Form>) {
    let (Some(form), Some(id)) = (editor.buffer(), editor.editing()) else {
        return;
    };
    let title = if editor.is_saving(id) {
        " Saving... ".to_string()
    } else {
        " Edit (Tab: Next | PgUp/PgDn: Row | Enter: Save | Esc: Cancel) ".to_string()
    };
    let block = panel(title).border_style(Style::default().fg(HIGHLIGHT));
    frame.render_widget(Paragraph::new(form_lines(form, true)).block(block), area);
}

/// Validates the edit buffer and, if it passes, sends it as a partial update.
pub(super) fn save_edit(
    editor: &mut RowEditor<Form>,
    notifier: &mut Notifier,
    build: impl FnOnce(&Form) -> Patch,
) -> Option<Action> {
    let form = editor.buffer_mut()?;
    if let Err(errors) = form.validate() {
        notifier.error(ClientError::Validation(errors).to_string());
        return None;
    }
    let patch = build(form);
    let id = editor.commit()?;
    Some(Action::Request(Command::Update { id, patch }))
}

/// Moves the cursor one row while an edit is open and starts editing the row
/// it lands on, discarding the previous buffer. A row `seed` refuses closes
/// the editor instead.
pub(super) fn move_edit<T>(
    cursor: &mut RowCursor,
    editor: &mut RowEditor<Form>,
    rows: &[T],
    forward: bool,
    seed: impl FnOnce(&T) -> Option<(RecordId, Form)>,
) {
    if forward {
        cursor.select_next(rows.len());
    } else {
        cursor.select_previous(rows.len());
    }
    match cursor.selected().and_then(|i| rows.get(i)).and_then(seed) {
        Some((id, form)) => editor.begin(id, form),
        None => editor.cancel(),
    }
}

/// Title for a populated list, marking a background refetch.
pub(super) fn list_title(name: &str, count: usize, fetching: bool) -> String {
    if fetching {
        format!(" {name} ({count}) ↻ ")
    } else {
        format!(" {name} ({count}) ")
    }
}

/// Settles an inline edit save and raises the matching notice.
pub(super) fn settle_edit(
    editor: &mut RowEditor<Form>,
    notifier: &mut Notifier,
    id: &RecordId,
    result: &Result<(), ClientError>,
    success: &str,
) {
    editor.settle(id, result.is_ok());
    match result {
        Ok(()) => notifier.success(success),
        Err(err) => notifier.error(err.to_string()),
    }
}

/// Text for a trimmed optional field: `None` when blank.
pub(super) fn non_empty(form: &Form, key: &str) -> Option<String> {
    let value = form.value(key).trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(super) fn field_error(key: &'static str, message: &'static str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.push(key, message);
    errors
}

/// Row cell text for an optional value.
pub(super) fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::cache::{Listing, QueryCache};
    use crate::models::*;
    use std::time::Instant;

    pub fn queue_entry(id: &str, number: u32, status: QueueStatus) -> QueueEntry {
        QueueEntry {
            id: RecordId::new(id),
            queue_number: number,
            status,
            created_at: None,
            patient: PartyRef {
                id: Some(RecordId::new("10")),
                name: Some("Ada Lovelace".to_string()),
            },
            doctor: PartyRef {
                id: Some(RecordId::new("20")),
                name: Some("Dr. Grey".to_string()),
            },
        }
    }

    pub fn appointment(id: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: RecordId::new(id),
            patient_name: Some("Ada Lovelace".to_string()),
            doctor: Some(DoctorSummary {
                id: Some(RecordId::new("20")),
                name: "Dr. Grey".to_string(),
                specialization: Some("Surgery".to_string()),
            }),
            date: parse_date("2025-03-01"),
            time: parse_time("09:30"),
            status,
        }
    }

    pub fn doctor(id: &str, name: &str) -> Doctor {
        Doctor {
            id: RecordId::new(id),
            name: name.to_string(),
            specialization: "Cardiology".to_string(),
            email: None,
            phone: None,
            gender: Some("F".to_string()),
            location: Some("Ward 3".to_string()),
            availability: Some("Mon-Fri".to_string()),
            created_at: None,
        }
    }

    pub fn user(id: &str, name: &str) -> User {
        User {
            id: RecordId::new(id),
            name: name.to_string(),
            email: format!("{}@hospital.test", name.to_lowercase()),
            role: Role::Staff,
            created_at: None,
        }
    }

    /// A cache with each listing already fetched.
    pub fn cache_with(listings: Vec<Listing>) -> QueryCache {
        let mut cache = QueryCache::new();
        for listing in listings {
            let resource = listing.resource();
            let seq = cache.begin_fetch(resource);
            cache.complete(resource, seq, Ok(listing), Instant::now());
        }
        cache
    }
}
