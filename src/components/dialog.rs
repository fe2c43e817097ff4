//! Modal create dialog driven by a form schema.

use super::widgets::{centered_rect, form_lines, panel, HELP, HIGHLIGHT};
use crate::forms::{FieldSpec, Form};
use crate::tui::Frame;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    /// The form validated and the caller should send it.
    Submitted,
    Cancelled,
}

#[derive(Debug)]
pub struct CreateDialog {
    title: &'static str,
    submit_label: &'static str,
    pending_label: &'static str,
    defaults: fn() -> Vec<(&'static str, String)>,
    form: Form,
    open: bool,
    pending: bool,
}

impl CreateDialog {
    pub fn new(
        title: &'static str,
        submit_label: &'static str,
        pending_label: &'static str,
        schema: &'static [FieldSpec],
        defaults: fn() -> Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            title,
            submit_label,
            pending_label,
            defaults,
            form: Form::with_values(schema, &defaults()),
            open: false,
            pending: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<DialogEvent> {
        match key.code {
            KeyCode::Esc => {
                self.open = false;
                return Some(DialogEvent::Cancelled);
            }
            KeyCode::Enter => {
                if self.pending {
                    return None;
                }
                if self.form.validate().is_ok() {
                    self.pending = true;
                    return Some(DialogEvent::Submitted);
                }
            }
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_previous(),
            KeyCode::Left => self.form.cycle(false),
            KeyCode::Right => self.form.cycle(true),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(c) => self.form.input_char(c),
            _ => {}
        }
        None
    }

    /// The create succeeded: reset to defaults and close.
    pub fn on_success(&mut self) {
        let schema = self.form.schema();
        self.form = Form::with_values(schema, &(self.defaults)());
        self.pending = false;
        self.open = false;
    }

    /// The create failed: keep the values so the user can retry.
    pub fn on_failure(&mut self) {
        self.pending = false;
    }

    pub fn render(&self, frame: &mut Frame) {
        if !self.open {
            return;
        }
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);

        let block = panel(format!(" {} ", self.title)).border_style(Style::default().fg(HIGHLIGHT));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Fields
                Constraint::Length(1), // Submit
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(inner);

        frame.render_widget(Paragraph::new(form_lines(&self.form, true)), layout[0]);

        let (label, style) = if self.is_pending() {
            (self.pending_label, Style::default().fg(HELP))
        } else {
            (
                self.submit_label,
                Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD),
            )
        };
        frame.render_widget(
            Paragraph::new(format!("[ {label} ]"))
                .style(style)
                .alignment(Alignment::Center),
            layout[1],
        );
        frame.render_widget(
            Paragraph::new("Tab: Next field | ←/→: Choose | Enter: Submit | Esc: Cancel")
                .style(Style::default().fg(HELP))
                .alignment(Alignment::Center),
            layout[2],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::widgets::render_to_string;
    use crate::forms::{FieldKind, Rule};
    use crossterm::event::KeyModifiers;

    const SCHEMA: &[FieldSpec] = &[FieldSpec {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
        placeholder: "",
    }];

    fn dialog() -> CreateDialog {
        CreateDialog::new("Add Thing", "Add", "Adding...", SCHEMA, Vec::new)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(dialog: &mut CreateDialog, text: &str) {
        for c in text.chars() {
            dialog.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn invalid_form_does_not_submit() {
        let mut dialog = dialog();
        dialog.open();
        type_text(&mut dialog, "J");
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), None);
        assert!(!dialog.is_pending());
        assert_eq!(
            dialog.form().error("name"),
            Some("Name must be at least 2 characters")
        );
    }

    #[test]
    fn submit_then_success_resets_and_closes() {
        let mut dialog = dialog();
        dialog.open();
        type_text(&mut dialog, "Jo");
        assert_eq!(
            dialog.handle_key(key(KeyCode::Enter)),
            Some(DialogEvent::Submitted)
        );
        assert!(dialog.is_pending());
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), None);

        dialog.on_success();
        assert!(!dialog.is_open());
        assert_eq!(dialog.form().value("name"), "");
    }

    #[test]
    fn failure_keeps_values_and_stays_open() {
        let mut dialog = dialog();
        dialog.open();
        type_text(&mut dialog, "Jo");
        dialog.handle_key(key(KeyCode::Enter));

        dialog.on_failure();
        assert!(dialog.is_open());
        assert!(!dialog.is_pending());
        assert_eq!(dialog.form().value("name"), "Jo");
    }

    #[test]
    fn pending_label_replaces_submit_label() {
        let mut dialog = dialog();
        dialog.open();
        type_text(&mut dialog, "Jo");
        let idle = render_to_string(80, 30, |f| dialog.render(f));
        assert!(idle.contains("[ Add ]"));

        dialog.handle_key(key(KeyCode::Enter));
        let pending = render_to_string(80, 30, |f| dialog.render(f));
        assert!(pending.contains("[ Adding... ]"));
    }
}
