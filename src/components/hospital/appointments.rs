//! Appointments: booking, complete/cancel, reschedule and delete.

use super::{list_title, move_edit, non_empty, or_dash, render_edit_panel, save_edit, settle_edit, split_for_editor, PageLayout};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::{Command, Mutation, MutationKind};
use crate::components::dialog::{CreateDialog, DialogEvent};
use crate::components::table::{edit_key, EditKey, RowCursor, RowEditor};
use crate::components::toast::Notifier;
use crate::components::widgets::{
    appointment_status_color, badge, panel, render_placeholder, selected_style, table_header, TEXT,
};
use crate::components::{Component, Page};
use crate::error::ClientError;
use crate::forms::{FieldKind, FieldSpec, Form, Rule};
use crate::models::{
    format_date, format_time, Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, NewRecord,
    Patch, RecordId, Resource, StatusSet,
};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::Instant;

const BOOK_APPOINTMENT: &[FieldSpec] = &[
    FieldSpec {
        key: "patientName",
        label: "Patient Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Patient name must be at least 2 characters")],
        placeholder: "Full name",
    },
    FieldSpec {
        key: "doctorId",
        label: "Doctor",
        kind: FieldKind::Lookup,
        rules: &[Rule::MinLen(1, "Please select a doctor")],
        placeholder: "←/→ to pick",
    },
    FieldSpec {
        key: "date",
        label: "Date",
        kind: FieldKind::Text,
        rules: &[Rule::Date("Date must be YYYY-MM-DD")],
        placeholder: "YYYY-MM-DD",
    },
    FieldSpec {
        key: "time",
        label: "Time",
        kind: FieldKind::Text,
        rules: &[Rule::Time("Time must be HH:MM")],
        placeholder: "HH:MM",
    },
];

const RESCHEDULE: &[FieldSpec] = &[
    FieldSpec {
        key: "date",
        label: "Date",
        kind: FieldKind::Text,
        rules: &[Rule::Date("Date must be YYYY-MM-DD")],
        placeholder: "YYYY-MM-DD",
    },
    FieldSpec {
        key: "time",
        label: "Time",
        kind: FieldKind::Text,
        rules: &[Rule::Time("Time must be HH:MM")],
        placeholder: "HH:MM",
    },
];

fn new_appointment(form: &Form) -> NewRecord {
    NewRecord::Appointment(NewAppointment {
        patient_name: form.value("patientName").trim().to_string(),
        doctor_id: form.value("doctorId").to_string(),
        date: form.value("date").trim().to_string(),
        time: form.value("time").trim().to_string(),
    })
}

fn reschedule_form(appointment: &Appointment) -> Form {
    Form::with_values(
        RESCHEDULE,
        &[
            ("date", appointment.date.map(format_date).unwrap_or_default()),
            ("time", appointment.time.map(format_time).unwrap_or_default()),
        ],
    )
}

fn reschedule_patch(form: &Form) -> Patch {
    Patch::Appointment(AppointmentPatch {
        status: None,
        date: non_empty(form, "date"),
        time: non_empty(form, "time"),
    })
}

pub struct AppointmentsPage {
    cursor: RowCursor,
    editor: RowEditor<Form>,
    dialog: CreateDialog,
    notifier: Notifier,
    /// Rows with a status change or delete in flight.
    busy: Vec<RecordId>,
}

impl AppointmentsPage {
    pub fn new() -> Self {
        Self {
            cursor: RowCursor::default(),
            editor: RowEditor::default(),
            dialog: CreateDialog::new(
                "Book Appointment",
                "Book Appointment",
                "Booking...",
                BOOK_APPOINTMENT,
                Vec::new,
            ),
            notifier: Notifier::default(),
            busy: Vec::new(),
        }
    }

    /// A row takes one mutation at a time, so update outcomes keyed by id
    /// settle the request that sent them.
    fn is_locked(&self, id: &RecordId) -> bool {
        self.busy.contains(id) || self.editor.is_saving(id)
    }

    fn set_status(&mut self, appointment: &Appointment, status: AppointmentStatus) -> Option<Action> {
        if appointment.status != AppointmentStatus::Booked || self.is_locked(&appointment.id) {
            return None;
        }
        self.busy.push(appointment.id.clone());
        Some(Action::Request(Command::Update {
            id: appointment.id.clone(),
            patch: Patch::Appointment(AppointmentPatch {
                status: Some(status),
                ..AppointmentPatch::default()
            }),
        }))
    }

    fn delete(&mut self, appointment: &Appointment) -> Option<Action> {
        if self.is_locked(&appointment.id) {
            return None;
        }
        self.busy.push(appointment.id.clone());
        Some(Action::Request(Command::Delete {
            resource: Resource::Appointments,
            id: appointment.id.clone(),
        }))
    }

    fn row(&self, appointment: &Appointment) -> Row<'static> {
        let status = if self.busy.contains(&appointment.id) || self.editor.is_saving(&appointment.id) {
            Cell::from("Saving...")
        } else {
            badge(
                appointment.status.label(),
                appointment_status_color(appointment.status),
            )
        };
        let marker = if self.editor.is_editing(&appointment.id) {
            "✎ "
        } else {
            ""
        };
        let doctor = appointment
            .doctor
            .as_ref()
            .map(|d| match &d.specialization {
                Some(spec) => format!("{} ({spec})", d.name),
                None => d.name.clone(),
            });
        Row::new(vec![
            Cell::from(format!(
                "{marker}{}",
                or_dash(appointment.patient_name.as_deref())
            )),
            Cell::from(or_dash(doctor.as_deref())),
            Cell::from(appointment.date.map(format_date).unwrap_or_else(|| "-".to_string())),
            Cell::from(appointment.time.map(format_time).unwrap_or_else(|| "-".to_string())),
            status,
        ])
        .style(Style::default().fg(TEXT))
    }
}

impl Component for AppointmentsPage {
    fn handle_input(&mut self, key: KeyEvent, cache: &QueryCache) -> Result<Option<Action>> {
        if self.dialog.is_open() {
            return Ok(match self.dialog.handle_key(key) {
                Some(DialogEvent::Submitted) => Some(Action::Request(Command::Create(new_appointment(
                    self.dialog.form(),
                )))),
                Some(DialogEvent::Cancelled) | None => None,
            });
        }
        let rows = cache.appointments.data().unwrap_or_default();
        if let Some(form) = self.editor.buffer_mut() {
            return Ok(match edit_key(form, key) {
                EditKey::Save => save_edit(&mut self.editor, &mut self.notifier, reschedule_patch),
                EditKey::Cancel => {
                    self.editor.cancel();
                    None
                }
                EditKey::StepRow(forward) => {
                    let busy = &self.busy;
                    move_edit(&mut self.cursor, &mut self.editor, rows, forward, |appointment: &Appointment| {
                        (!busy.contains(&appointment.id))
                            .then(|| (appointment.id.clone(), reschedule_form(appointment)))
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
            KeyCode::Char('c') => {
                if let Some(appointment) = selected {
                    return Ok(self.set_status(appointment, AppointmentStatus::Completed));
                }
            }
            KeyCode::Char('x') => {
                if let Some(appointment) = selected {
                    return Ok(self.set_status(appointment, AppointmentStatus::Cancelled));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(appointment) = selected {
                    return Ok(self.delete(appointment));
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(appointment) = selected.filter(|a| !self.busy.contains(&a.id)) {
                    self.editor
                        .begin(appointment.id.clone(), reschedule_form(appointment));
                }
            }
            KeyCode::Char('a') => self.dialog.open(),
            KeyCode::Char('r') => return Ok(Some(Action::Refresh(Resource::Appointments))),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        let layout = PageLayout::new(area);
        layout.render_chrome(
            frame,
            "APPOINTMENTS",
            cache.appointments.error(),
            &self.notifier,
            "↑↓: Navigate | c: Complete | x: Cancel | e: Reschedule | d: Delete | a: Book | r: Refresh | Esc: Back",
        );

        let (table_area, edit_area) = split_for_editor(layout.body, &self.editor);
        match cache.appointments.data() {
            None if cache.appointments.is_loading() => {
                render_placeholder(frame, table_area, " Appointments ", "Loading appointments...")
            }
            None => frame.render_widget(panel(" Appointments "), table_area),
            Some([]) => render_placeholder(
                frame,
                table_area,
                " Appointments (0) ",
                "No appointments booked",
            ),
            Some(rows) => {
                let table = Table::new(
                    rows.iter().map(|a| self.row(a)),
                    [
                        Constraint::Percentage(25),
                        Constraint::Percentage(30),
                        Constraint::Percentage(15),
                        Constraint::Percentage(10),
                        Constraint::Percentage(20),
                    ],
                )
                .header(table_header(&["Patient", "Doctor", "Date", "Time", "Status"]))
                .block(panel(list_title("Appointments", rows.len(), cache.appointments.is_fetching())))
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

impl Page for AppointmentsPage {
    fn resources(&self) -> &'static [Resource] {
        &[Resource::Appointments, Resource::Doctors]
    }

    fn captures_input(&self) -> bool {
        self.dialog.is_open() || self.editor.editing().is_some()
    }

    fn sync(&mut self, cache: &QueryCache) {
        if let Some(rows) = cache.appointments.data() {
            self.cursor.clamp(rows.len());
        }
        let doctors = cache
            .doctors
            .data()
            .unwrap_or_default()
            .iter()
            .map(|d| (d.id.to_string(), format!("{} ({})", d.name, d.specialization)))
            .collect();
        self.dialog.form_mut().set_lookup(doctors);
    }

    fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>) {
        match &mutation.kind {
            MutationKind::Create => match result {
                Ok(()) => {
                    self.dialog.on_success();
                    self.notifier.success("Appointment booked");
                }
                Err(err) => {
                    self.dialog.on_failure();
                    self.notifier.error(err.to_string());
                }
            },
            MutationKind::Update(id) if self.editor.is_saving(id) => {
                settle_edit(&mut self.editor, &mut self.notifier, id, result, "Appointment rescheduled");
            }
            MutationKind::Update(id) => {
                self.busy.retain(|row| row != id);
                match result {
                    Ok(()) => self.notifier.success("Appointment status updated"),
                    Err(err) => self.notifier.error(err.to_string()),
                }
            }
            MutationKind::Delete(id) => {
                self.busy.retain(|row| row != id);
                match result {
                    Ok(()) => self.notifier.success("Appointment deleted"),
                    Err(err) => self.notifier.error(err.to_string()),
                }
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        self.notifier.expire(now);
    }
}
