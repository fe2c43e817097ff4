//! Doctor roster: inline edit, delete and the Add Doctor dialog.

use super::{list_title, move_edit, non_empty, or_dash, render_edit_panel, save_edit, settle_edit, split_for_editor, PageLayout};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::{Command, Mutation, MutationKind};
use crate::components::dialog::{CreateDialog, DialogEvent};
use crate::components::table::{edit_key, EditKey, RowCursor, RowEditor};
use crate::components::toast::Notifier;
use crate::components::widgets::{panel, render_placeholder, selected_style, table_header, TEXT};
use crate::components::{Component, Page};
use crate::error::ClientError;
use crate::forms::{FieldKind, FieldSpec, Form, Rule};
use crate::models::{Doctor, DoctorPatch, NewDoctor, NewRecord, Patch, RecordId, Resource};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::Instant;

const ADD_DOCTOR: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
        placeholder: "Dr. Jane Doe",
    },
    FieldSpec {
        key: "specialization",
        label: "Specialization",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Specialization must be at least 2 characters")],
        placeholder: "Cardiology",
    },
    FieldSpec {
        key: "gender",
        label: "Gender",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(1, "Gender is required")],
        placeholder: "F / M",
    },
    FieldSpec {
        key: "location",
        label: "Location",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Location must be at least 2 characters")],
        placeholder: "Ward 3",
    },
    FieldSpec {
        key: "availability",
        label: "Availability",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(5, "Availability must be at least 5 characters")],
        placeholder: "Mon-Fri 9-17",
    },
];

/// Edits may leave optional fields blank; blanks are not sent.
const EDIT_DOCTOR: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
        placeholder: "",
    },
    FieldSpec {
        key: "specialization",
        label: "Specialization",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Specialization must be at least 2 characters")],
        placeholder: "",
    },
    FieldSpec {
        key: "gender",
        label: "Gender",
        kind: FieldKind::Text,
        rules: &[],
        placeholder: "",
    },
    FieldSpec {
        key: "location",
        label: "Location",
        kind: FieldKind::Text,
        rules: &[Rule::MinLenIfPresent(2, "Location must be at least 2 characters")],
        placeholder: "",
    },
    FieldSpec {
        key: "availability",
        label: "Availability",
        kind: FieldKind::Text,
        rules: &[Rule::MinLenIfPresent(5, "Availability must be at least 5 characters")],
        placeholder: "",
    },
];

fn new_doctor(form: &Form) -> NewRecord {
    let text = |key: &str| form.value(key).trim().to_string();
    NewRecord::Doctor(NewDoctor {
        name: text("name"),
        specialization: text("specialization"),
        gender: text("gender"),
        location: text("location"),
        availability: text("availability"),
    })
}

fn edit_form(doctor: &Doctor) -> Form {
    Form::with_values(
        EDIT_DOCTOR,
        &[
            ("name", doctor.name.clone()),
            ("specialization", doctor.specialization.clone()),
            ("gender", doctor.gender.clone().unwrap_or_default()),
            ("location", doctor.location.clone().unwrap_or_default()),
            ("availability", doctor.availability.clone().unwrap_or_default()),
        ],
    )
}

fn doctor_patch(form: &Form) -> Patch {
    Patch::Doctor(DoctorPatch {
        name: non_empty(form, "name"),
        specialization: non_empty(form, "specialization"),
        gender: non_empty(form, "gender"),
        location: non_empty(form, "location"),
        availability: non_empty(form, "availability"),
    })
}

pub struct DoctorsPage {
    cursor: RowCursor,
    editor: RowEditor<Form>,
    dialog: CreateDialog,
    notifier: Notifier,
    deleting: Vec<RecordId>,
}

impl DoctorsPage {
    pub fn new() -> Self {
        Self {
            cursor: RowCursor::default(),
            editor: RowEditor::default(),
            dialog: CreateDialog::new("Add Doctor", "Add Doctor", "Adding...", ADD_DOCTOR, Vec::new),
            notifier: Notifier::default(),
            deleting: Vec::new(),
        }
    }
}

impl Component for DoctorsPage {
    fn handle_input(&mut self, key: KeyEvent, cache: &QueryCache) -> Result<Option<Action>> {
        if self.dialog.is_open() {
            return Ok(match self.dialog.handle_key(key) {
                Some(DialogEvent::Submitted) => {
                    Some(Action::Request(Command::Create(new_doctor(self.dialog.form()))))
                }
                Some(DialogEvent::Cancelled) | None => None,
            });
        }
        let rows = cache.doctors.data().unwrap_or_default();
        if let Some(form) = self.editor.buffer_mut() {
            return Ok(match edit_key(form, key) {
                EditKey::Save => save_edit(&mut self.editor, &mut self.notifier, doctor_patch),
                EditKey::Cancel => {
                    self.editor.cancel();
                    None
                }
                EditKey::StepRow(forward) => {
                    move_edit(&mut self.cursor, &mut self.editor, rows, forward, |doctor: &Doctor| {
                        Some((doctor.id.clone(), edit_form(doctor)))
                    });
                    None
                }
                EditKey::Handled => None,
            });
        }

        let selected = self.cursor.selected().and_then(|i| rows.get(i));
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.cursor.select_next(rows.len()),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.select_previous(rows.len()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(doctor) = selected {
                    self.editor.begin(doctor.id.clone(), edit_form(doctor));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(doctor) = selected {
                    if !self.deleting.contains(&doctor.id) {
                        self.deleting.push(doctor.id.clone());
                        return Ok(Some(Action::Request(Command::Delete {
                            resource: Resource::Doctors,
                            id: doctor.id.clone(),
                        })));
                    }
                }
            }
            KeyCode::Char('a') => self.dialog.open(),
            KeyCode::Char('r') => return Ok(Some(Action::Refresh(Resource::Doctors))),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        let layout = PageLayout::new(area);
        layout.render_chrome(
            frame,
            "DOCTORS",
            cache.doctors.error(),
            &self.notifier,
            "↑↓: Navigate | e: Edit | d: Delete | a: Add doctor | r: Refresh | 1-4: Pages | Esc: Back",
        );

        let (table_area, edit_area) = split_for_editor(layout.body, &self.editor);
        match cache.doctors.data() {
            None if cache.doctors.is_loading() => {
                render_placeholder(frame, table_area, " Doctors ", "Loading doctors...")
            }
            None => frame.render_widget(panel(" Doctors "), table_area),
            Some([]) => render_placeholder(frame, table_area, " Doctors (0) ", "No doctors on record"),
            Some(rows) => {
                let table_rows = rows.iter().map(|doctor| {
                    let marker = if self.editor.is_saving(&doctor.id) || self.deleting.contains(&doctor.id) {
                        "… "
                    } else if self.editor.is_editing(&doctor.id) {
                        "✎ "
                    } else {
                        ""
                    };
                    Row::new(vec![
                        Cell::from(format!("{marker}{}", doctor.name)),
                        Cell::from(doctor.specialization.clone()),
                        Cell::from(or_dash(doctor.gender.as_deref())),
                        Cell::from(or_dash(doctor.location.as_deref())),
                        Cell::from(or_dash(doctor.availability.as_deref())),
                    ])
                    .style(Style::default().fg(TEXT))
                });
                let table = Table::new(
                    table_rows,
                    [
                        Constraint::Percentage(25),
                        Constraint::Percentage(20),
                        Constraint::Percentage(10),
                        Constraint::Percentage(20),
                        Constraint::Percentage(25),
                    ],
                )
                .header(table_header(&[
                    "Name",
                    "Specialization",
                    "Gender",
                    "Location",
                    "Availability",
                ]))
                .block(panel(list_title("Doctors", rows.len(), cache.doctors.is_fetching())))
                .row_highlight_style(selected_style())
                .highlight_symbol("► ");
                let mut state = self.cursor.state();
                frame.render_stateful_widget(table, table_area, &mut state);
            }
        }
        if let Some(edit_area) = edit_area {
            render_edit_panel(frame, edit_area, &self.editor);
        }

        self.dialog.render(frame);
    }
}

impl Page for DoctorsPage {
    fn resources(&self) -> &'static [Resource] {
        &[Resource::Doctors]
    }

    fn captures_input(&self) -> bool {
        self.dialog.is_open() || self.editor.editing().is_some()
    }

    fn sync(&mut self, cache: &QueryCache) {
        if let Some(rows) = cache.doctors.data() {
            self.cursor.clamp(rows.len());
        }
    }

    fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>) {
        match &mutation.kind {
            MutationKind::Create => match result {
                Ok(()) => {
                    self.dialog.on_success();
                    self.notifier.success("Doctor added");
                }
                Err(err) => {
                    self.dialog.on_failure();
                    self.notifier.error(err.to_string());
                }
            },
            MutationKind::Update(id) => {
                settle_edit(&mut self.editor, &mut self.notifier, id, result, "Doctor updated");
            }
            MutationKind::Delete(id) => {
                self.deleting.retain(|row| row != id);
                match result {
                    Ok(()) => self.notifier.success("Doctor deleted"),
                    Err(err) => self.notifier.error(err.to_string()),
                }
            }
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
    use crate::components::hospital::fixtures::{cache_with, doctor};
    use crate::components::widgets::render_to_string;
    use crossterm::event::KeyModifiers;

    fn press(page: &mut DoctorsPage, cache: &QueryCache, code: KeyCode) -> Option<Action> {
        page.handle_input(KeyEvent::new(code, KeyModifiers::NONE), cache)
            .unwrap()
    }

    fn type_text(page: &mut DoctorsPage, cache: &QueryCache, text: &str) {
        for c in text.chars() {
            press(page, cache, KeyCode::Char(c));
        }
    }

    fn loaded() -> QueryCache {
        cache_with(vec![Listing::Doctors(vec![
            doctor("1", "Dr. Grey"),
            doctor("2", "Dr. House"),
        ])])
    }

    fn page_for(cache: &QueryCache) -> DoctorsPage {
        let mut page = DoctorsPage::new();
        page.sync(cache);
        page
    }

    #[test]
    fn empty_specialization_blocks_submission() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('a'));
        type_text(&mut page, &cache, "Dr. Who");
        press(&mut page, &cache, KeyCode::Tab);
        press(&mut page, &cache, KeyCode::Tab);
        type_text(&mut page, &cache, "M");
        press(&mut page, &cache, KeyCode::Tab);
        type_text(&mut page, &cache, "Tardis");
        press(&mut page, &cache, KeyCode::Tab);
        type_text(&mut page, &cache, "Always");

        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        assert_eq!(
            page.dialog.form().error("specialization"),
            Some("Specialization must be at least 2 characters")
        );
        assert!(!page.dialog.is_pending());
    }

    #[test]
    fn valid_doctor_is_submitted() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('a'));
        for (i, value) in ["Dr. Who", "Time", "M", "Tardis", "Always"].iter().enumerate() {
            if i > 0 {
                press(&mut page, &cache, KeyCode::Tab);
            }
            type_text(&mut page, &cache, value);
        }
        let action = press(&mut page, &cache, KeyCode::Enter);
        assert_eq!(
            action,
            Some(Action::Request(Command::Create(NewRecord::Doctor(NewDoctor {
                name: "Dr. Who".to_string(),
                specialization: "Time".to_string(),
                gender: "M".to_string(),
                location: "Tardis".to_string(),
                availability: "Always".to_string(),
            }))))
        );
    }

    #[test]
    fn cancelled_edit_is_discarded_before_next_row() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        type_text(&mut page, &cache, " Jr");
        press(&mut page, &cache, KeyCode::Esc);

        press(&mut page, &cache, KeyCode::Down);
        press(&mut page, &cache, KeyCode::Char('e'));
        assert!(page.editor.is_editing(&RecordId::new("2")));
        assert!(!page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Dr. House");
    }

    #[test]
    fn paging_while_editing_moves_the_edit_to_the_next_row() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        type_text(&mut page, &cache, " Jr");

        press(&mut page, &cache, KeyCode::PageDown);
        assert_eq!(page.cursor.selected(), Some(1));
        assert!(page.editor.is_editing(&RecordId::new("2")));
        assert!(!page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Dr. House");

        press(&mut page, &cache, KeyCode::PageUp);
        assert!(page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Dr. Grey");
    }

    #[test]
    fn earlier_save_does_not_close_the_row_edited_since() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        let action = press(&mut page, &cache, KeyCode::Enter);
        assert!(matches!(action, Some(Action::Request(Command::Update { .. }))));
        press(&mut page, &cache, KeyCode::PageDown);

        page.on_mutation(
            &Mutation {
                resource: Resource::Doctors,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Ok(()),
        );
        assert!(page.editor.is_editing(&RecordId::new("2")));
        assert!(!page.editor.is_saving(&RecordId::new("1")));
        assert_eq!(page.notifier.current().unwrap().message, "Doctor updated");
    }

    #[test]
    fn failed_update_keeps_editing() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        type_text(&mut page, &cache, " Jr");
        let action = press(&mut page, &cache, KeyCode::Enter);
        assert!(matches!(action, Some(Action::Request(Command::Update { .. }))));

        page.on_mutation(
            &Mutation {
                resource: Resource::Doctors,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Err(ClientError::Api {
                status: 409,
                message: "Name taken".to_string(),
            }),
        );
        assert!(page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Dr. Grey Jr");
        assert_eq!(page.notifier.current().unwrap().message, "Name taken");
    }

    #[test]
    fn delete_success_notifies() {
        let cache = loaded();
        let mut page = page_for(&cache);
        assert_eq!(
            press(&mut page, &cache, KeyCode::Char('d')),
            Some(Action::Request(Command::Delete {
                resource: Resource::Doctors,
                id: RecordId::new("1"),
            }))
        );
        page.on_mutation(
            &Mutation {
                resource: Resource::Doctors,
                kind: MutationKind::Delete(RecordId::new("1")),
            },
            &Ok(()),
        );
        assert!(page.deleting.is_empty());
        assert_eq!(page.notifier.current().unwrap().message, "Doctor deleted");
    }

    #[test]
    fn background_refetch_keeps_rows_and_marks_title() {
        let mut cache = loaded();
        cache.begin_fetch(Resource::Doctors);
        let page = page_for(&cache);
        let screen = render_to_string(120, 30, |f| {
            let area = f.area();
            page.render(f, area, &cache)
        });
        assert!(screen.contains("Doctors (2) ↻"));
        assert!(screen.contains("Dr. House"));
        assert!(!screen.contains("Loading doctors..."));
    }
}
