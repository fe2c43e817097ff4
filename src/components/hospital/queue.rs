//! Patient queue: status picker per row and the Add Patient dialog.

use super::{field_error, list_title, PageLayout};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::{Command, Mutation, MutationKind};
use crate::components::dialog::{CreateDialog, DialogEvent};
use crate::components::table::{RowCursor, StatusPicker};
use crate::components::toast::Notifier;
use crate::components::widgets::{
    badge, centered_rect, panel, queue_status_color, render_placeholder, selected_style, table_header, HIGHLIGHT,
    TEXT,
};
use crate::components::{Component, Page};
use crate::error::{ClientError, FieldErrors};
use crate::forms::{FieldKind, FieldSpec, Form, Rule};
use crate::models::{
    display_date, display_time, format_date, format_rfc3339, format_time, parse_timestamp, NewQueueEntry,
    NewRecord, Patch, QueuePatch, QueueStatus, RecordId, Resource, StatusSet,
};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::Instant;
use time::OffsetDateTime;

const STATUSES: &[&str] = &["Waiting", "With Doctor", "Completed"];

const ADD_PATIENT: &[FieldSpec] = &[
    FieldSpec {
        key: "queueNumber",
        label: "Queue Number",
        kind: FieldKind::Number,
        rules: &[Rule::PositiveInt("Queue number must be a positive number")],
        placeholder: "e.g. 12",
    },
    FieldSpec {
        key: "status",
        label: "Status",
        kind: FieldKind::Choice(STATUSES),
        rules: &[Rule::OneOf(STATUSES, "Select a status")],
        placeholder: "",
    },
    FieldSpec {
        key: "user",
        label: "Patient (User ID)",
        kind: FieldKind::Number,
        rules: &[Rule::PositiveInt("Patient ID must be a positive number")],
        placeholder: "e.g. 3",
    },
    FieldSpec {
        key: "doctor",
        label: "Doctor ID",
        kind: FieldKind::Number,
        rules: &[Rule::PositiveInt("Doctor ID must be a positive number")],
        placeholder: "e.g. 1",
    },
    FieldSpec {
        key: "createdAt",
        label: "Created At (UTC)",
        kind: FieldKind::Text,
        rules: &[Rule::DateTime("Use YYYY-MM-DD HH:MM")],
        placeholder: "YYYY-MM-DD HH:MM",
    },
];

fn add_patient_defaults() -> Vec<(&'static str, String)> {
    let now = OffsetDateTime::now_utc();
    vec![
        ("status", QueueStatus::Waiting.label().to_string()),
        (
            "createdAt",
            format!("{} {}", format_date(now.date()), format_time(now.time())),
        ),
    ]
}

/// Maps a validated Add Patient form to a create body.
fn new_queue_entry(form: &Form) -> Result<NewRecord, FieldErrors> {
    let queue_number = u32::try_from(form.positive("queueNumber")?)
        .map_err(|_| field_error("queueNumber", "Queue number is too large"))?;
    let status = QueueStatus::from_label(form.value("status"))
        .ok_or_else(|| field_error("status", "Select a status"))?;
    let created_at = parse_timestamp(form.value("createdAt"))
        .ok_or_else(|| field_error("createdAt", "Use YYYY-MM-DD HH:MM"))?;
    Ok(NewRecord::QueueEntry(NewQueueEntry {
        queue_number,
        status,
        user: form.positive("user")?,
        doctor: form.positive("doctor")?,
        created_at: format_rfc3339(created_at),
    }))
}

pub struct QueuePage {
    cursor: RowCursor,
    picker: Option<StatusPicker<QueueStatus>>,
    dialog: CreateDialog,
    notifier: Notifier,
    /// Rows with a status change in flight.
    updating: Vec<RecordId>,
}

impl QueuePage {
    pub fn new() -> Self {
        Self {
            cursor: RowCursor::default(),
            picker: None,
            dialog: CreateDialog::new(
                "Add Patient to Queue",
                "Add Patient",
                "Adding...",
                ADD_PATIENT,
                add_patient_defaults,
            ),
            notifier: Notifier::default(),
            updating: Vec::new(),
        }
    }

    fn submit(&mut self) -> Option<Action> {
        match new_queue_entry(self.dialog.form()) {
            Ok(record) => Some(Action::Request(Command::Create(record))),
            Err(errors) => {
                self.dialog.on_failure();
                self.notifier.error(ClientError::Validation(errors).to_string());
                None
            }
        }
    }

    fn handle_picker(&mut self, key: KeyEvent) -> Option<Action> {
        let picker = self.picker.as_mut()?;
        match key.code {
            KeyCode::Up => picker.previous(),
            KeyCode::Down | KeyCode::Tab => picker.next(),
            KeyCode::Esc => self.picker = None,
            KeyCode::Enter => {
                let picker = self.picker.take()?;
                let status = picker.chosen()?;
                self.updating.push(picker.row.clone());
                return Some(Action::Request(Command::Update {
                    id: picker.row,
                    patch: Patch::Queue(QueuePatch { status }),
                }));
            }
            _ => {}
        }
        None
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect) {
        let Some(picker) = &self.picker else {
            return;
        };
        let area = centered_rect(30, 30, area);
        frame.render_widget(Clear, area);

        let highlighted = picker.highlighted();
        let items: Vec<ListItem> = QueueStatus::ALL
            .iter()
            .map(|status| {
                let marker = if *status == picker.current { " (current)" } else { "" };
                ListItem::new(format!("{}{marker}", status.label()))
                    .style(Style::default().fg(queue_status_color(*status)))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(highlighted.position()));
        let list = List::new(items)
            .block(panel(" Set Status ").border_style(Style::default().fg(HIGHLIGHT)))
            .highlight_style(selected_style())
            .highlight_symbol("► ");
        frame.render_stateful_widget(list, area, &mut state);
    }
}

impl Component for QueuePage {
    fn handle_input(&mut self, key: KeyEvent, cache: &QueryCache) -> Result<Option<Action>> {
        if self.dialog.is_open() {
            return Ok(match self.dialog.handle_key(key) {
                Some(DialogEvent::Submitted) => self.submit(),
                Some(DialogEvent::Cancelled) | None => None,
            });
        }
        if self.picker.is_some() {
            return Ok(self.handle_picker(key));
        }

        let rows = cache.queue.data().unwrap_or_default();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.cursor.select_next(rows.len()),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.select_previous(rows.len()),
            KeyCode::Enter | KeyCode::Char('s') => {
                let selected = self.cursor.selected().and_then(|i| rows.get(i));
                if let Some(entry) = selected.filter(|e| !self.updating.contains(&e.id)) {
                    self.picker = Some(StatusPicker::new(entry.id.clone(), entry.status));
                }
            }
            KeyCode::Char('a') => self.dialog.open(),
            KeyCode::Char('r') => return Ok(Some(Action::Refresh(Resource::Queue))),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        let layout = PageLayout::new(area);
        layout.render_chrome(
            frame,
            "PATIENT QUEUE",
            cache.queue.error(),
            &self.notifier,
            "↑↓: Navigate | Enter: Set status | a: Add patient | r: Refresh | 1-4: Pages | Esc: Back",
        );

        match cache.queue.data() {
            None if cache.queue.is_loading() => {
                render_placeholder(frame, layout.body, " Queue ", "Loading patient queue...")
            }
            None => frame.render_widget(panel(" Queue "), layout.body),
            Some([]) => render_placeholder(frame, layout.body, " Queue (0) ", "No patients in queue"),
            Some(rows) => {
                let table_rows = rows.iter().map(|entry| {
                    let status = if self.updating.contains(&entry.id) {
                        Cell::from("Updating...")
                    } else {
                        badge(entry.status.label(), queue_status_color(entry.status))
                    };
                    Row::new(vec![
                        Cell::from(entry.queue_number.to_string()),
                        Cell::from(entry.patient.display("Unknown patient")),
                        Cell::from(entry.doctor.display("Unassigned")),
                        status,
                        Cell::from(display_date(entry.created_at)),
                        Cell::from(display_time(entry.created_at)),
                    ])
                    .style(Style::default().fg(TEXT))
                });
                let table = Table::new(
                    table_rows,
                    [
                        Constraint::Percentage(8),
                        Constraint::Percentage(24),
                        Constraint::Percentage(24),
                        Constraint::Percentage(16),
                        Constraint::Percentage(16),
                        Constraint::Percentage(12),
                    ],
                )
                .header(table_header(&["No.", "Patient", "Doctor", "Status", "Date", "Time"]))
                .block(panel(list_title("Queue", rows.len(), cache.queue.is_fetching())))
                .row_highlight_style(selected_style())
                .highlight_symbol("► ");
                let mut state = self.cursor.state();
                frame.render_stateful_widget(table, layout.body, &mut state);
            }
        }

        self.render_picker(frame, layout.body);
        self.dialog.render(frame);
    }
}

impl Page for QueuePage {
    fn resources(&self) -> &'static [Resource] {
        &[Resource::Queue]
    }

    fn captures_input(&self) -> bool {
        self.dialog.is_open() || self.picker.is_some()
    }

    fn sync(&mut self, cache: &QueryCache) {
        if let Some(rows) = cache.queue.data() {
            self.cursor.clamp(rows.len());
        }
    }

    fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>) {
        match (&mutation.kind, result) {
            (MutationKind::Create, Ok(())) => {
                self.dialog.on_success();
                self.notifier.success("Patient added to queue");
            }
            (MutationKind::Create, Err(err)) => {
                self.dialog.on_failure();
                self.notifier.error(err.to_string());
            }
            (MutationKind::Update(id), result) => {
                self.updating.retain(|row| row != id);
                match result {
                    Ok(()) => self.notifier.success("Patient status updated"),
                    Err(err) => self.notifier.error(err.to_string()),
                }
            }
            (MutationKind::Delete(_), _) => {}
        }
    }

    fn tick(&mut self, now: Instant) {
        self.notifier.expire(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Listing;
    use crate::components::hospital::fixtures::{cache_with, queue_entry};
    use crate::components::toast::ToastKind;
    use crate::components::widgets::render_to_string;
    use crossterm::event::KeyModifiers;

    fn press(page: &mut QueuePage, cache: &QueryCache, code: KeyCode) -> Option<Action> {
        page.handle_input(KeyEvent::new(code, KeyModifiers::NONE), cache)
            .unwrap()
    }

    fn type_text(page: &mut QueuePage, cache: &QueryCache, text: &str) {
        for c in text.chars() {
            press(page, cache, KeyCode::Char(c));
        }
    }

    fn loaded() -> QueryCache {
        cache_with(vec![Listing::Queue(vec![
            queue_entry("1", 1, QueueStatus::Waiting),
            queue_entry("2", 2, QueueStatus::WithDoctor),
        ])])
    }

    #[test]
    fn picking_a_status_patches_immediately() {
        let cache = loaded();
        let mut page = QueuePage::new();
        page.sync(&cache);

        press(&mut page, &cache, KeyCode::Enter);
        assert!(page.captures_input());
        press(&mut page, &cache, KeyCode::Down);
        press(&mut page, &cache, KeyCode::Down);

        assert_eq!(
            press(&mut page, &cache, KeyCode::Enter),
            Some(Action::Request(Command::Update {
                id: RecordId::new("1"),
                patch: Patch::Queue(QueuePatch {
                    status: QueueStatus::Completed,
                }),
            }))
        );
        assert!(!page.captures_input());

        page.on_mutation(
            &Mutation {
                resource: Resource::Queue,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Ok(()),
        );
        let toast = page.notifier.current().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert!(page.updating.is_empty());
    }

    #[test]
    fn row_with_status_in_flight_cannot_be_picked_again() {
        let cache = loaded();
        let mut page = QueuePage::new();
        page.sync(&cache);

        press(&mut page, &cache, KeyCode::Enter);
        press(&mut page, &cache, KeyCode::Down);
        assert!(press(&mut page, &cache, KeyCode::Enter).is_some());
        assert_eq!(page.updating, vec![RecordId::new("1")]);

        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        assert!(!page.captures_input());

        page.on_mutation(
            &Mutation {
                resource: Resource::Queue,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Err(ClientError::Api {
                status: 500,
                message: "queue offline".to_string(),
            }),
        );
        press(&mut page, &cache, KeyCode::Enter);
        assert!(page.captures_input());
    }

    #[test]
    fn picking_the_same_status_sends_nothing() {
        let cache = loaded();
        let mut page = QueuePage::new();
        page.sync(&cache);
        press(&mut page, &cache, KeyCode::Enter);
        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        assert!(page.picker.is_none());
    }

    #[test]
    fn add_patient_builds_create_body() {
        let cache = loaded();
        let mut page = QueuePage::new();
        press(&mut page, &cache, KeyCode::Char('a'));
        type_text(&mut page, &cache, "7");
        press(&mut page, &cache, KeyCode::Tab);
        press(&mut page, &cache, KeyCode::Tab);
        type_text(&mut page, &cache, "3");
        press(&mut page, &cache, KeyCode::Tab);
        type_text(&mut page, &cache, "1");

        let action = press(&mut page, &cache, KeyCode::Enter);
        let Some(Action::Request(Command::Create(NewRecord::QueueEntry(body)))) = action else {
            panic!("expected a queue create, got {action:?}");
        };
        assert_eq!(body.queue_number, 7);
        assert_eq!(body.status, QueueStatus::Waiting);
        assert_eq!(body.user, 3);
        assert_eq!(body.doctor, 1);
        assert!(parse_timestamp(&body.created_at).is_some());
    }

    #[test]
    fn invalid_add_patient_sends_nothing() {
        let cache = loaded();
        let mut page = QueuePage::new();
        press(&mut page, &cache, KeyCode::Char('a'));
        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        assert_eq!(
            page.dialog.form().error("queueNumber"),
            Some("Queue number must be a positive number")
        );
        assert!(page.dialog.is_open());
    }

    #[test]
    fn failed_create_keeps_dialog_open() {
        let cache = loaded();
        let mut page = QueuePage::new();
        press(&mut page, &cache, KeyCode::Char('a'));
        type_text(&mut page, &cache, "9");

        page.on_mutation(
            &Mutation {
                resource: Resource::Queue,
                kind: MutationKind::Create,
            },
            &Err(ClientError::Network("refused".to_string())),
        );
        assert!(page.dialog.is_open());
        assert_eq!(page.dialog.form().value("queueNumber"), "9");
        assert_eq!(
            page.notifier.current().unwrap().message,
            "Network error. Please check your connection."
        );
    }

    #[test]
    fn renders_rows_and_read_error_banner() {
        let mut cache = loaded();
        cache.invalidate(Resource::Queue);
        let seq = cache.begin_fetch(Resource::Queue);
        cache.complete(
            Resource::Queue,
            seq,
            Err(ClientError::Api {
                status: 500,
                message: "queue offline".to_string(),
            }),
            Instant::now(),
        );

        let page = QueuePage::new();
        let screen = render_to_string(120, 30, |f| {
            let area = f.area();
            page.render(f, area, &cache)
        });
        assert!(screen.contains("Failed to load: queue offline"));
        assert!(screen.contains("Ada Lovelace"));
        assert!(screen.contains("With Doctor"));
    }

    #[test]
    fn missing_collection_renders_nothing() {
        let cache = QueryCache::new();
        let page = QueuePage::new();
        let screen = render_to_string(120, 30, |f| {
            let area = f.area();
            page.render(f, area, &cache)
        });
        assert!(screen.contains("Loading patient queue..."));
        assert!(!screen.contains("No."));
    }
}
