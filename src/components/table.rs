//! Row selection, per-row inline editing and the status picker.

use crate::forms::Form;
use crate::models::{RecordId, StatusSet};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::TableState;

/// Selection over a list whose length can change between frames.
#[derive(Debug, Default, Clone)]
pub struct RowCursor {
    state: TableState,
}

impl RowCursor {
    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let next = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(next));
    }

    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let previous = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => (i - 1).min(len - 1),
        };
        self.state.select(Some(previous));
    }

    /// Keeps the selection valid after the list was refetched.
    pub fn clamp(&mut self, len: usize) {
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            None => self.state.select(Some(0)),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    /// State for `render_stateful_widget`, which needs it mutably.
    pub fn state(&self) -> TableState {
        self.state.clone()
    }
}

/// Which row, if any, is being edited, and the edit buffer for it.
///
/// Only one row is editable at a time. The buffer survives a failed save so
/// the user can correct it.
#[derive(Debug)]
pub struct RowEditor<B> {
    editing: Option<RecordId>,
    buffer: Option<B>,
    saving: Option<RecordId>,
}

impl<B> Default for RowEditor<B> {
    fn default() -> Self {
        Self {
            editing: None,
            buffer: None,
            saving: None,
        }
    }
}

impl<B> RowEditor<B> {
    /// Starts editing `id`, discarding any other row's buffer.
    pub fn begin(&mut self, id: RecordId, buffer: B) {
        self.editing = Some(id);
        self.buffer = Some(buffer);
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.buffer = None;
    }

    pub fn editing(&self) -> Option<&RecordId> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self, id: &RecordId) -> bool {
        self.editing.as_ref() == Some(id)
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut B> {
        self.buffer.as_mut()
    }

    pub fn is_saving(&self, id: &RecordId) -> bool {
        self.saving.as_ref() == Some(id)
    }

    /// Marks the edited row as saving and returns its id. Returns `None` when
    /// nothing is being edited or that row is already saving.
    pub fn commit(&mut self) -> Option<RecordId> {
        let id = self.editing.clone()?;
        if self.is_saving(&id) {
            return None;
        }
        self.saving = Some(id.clone());
        Some(id)
    }

    /// Settles a save for `id`. Success closes the editor only if it is still
    /// on that row; failure keeps the buffer.
    pub fn settle(&mut self, id: &RecordId, ok: bool) {
        if self.is_saving(id) {
            self.saving = None;
        }
        if ok && self.is_editing(id) {
            self.cancel();
        }
    }
}

/// Open status picker for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPicker<S: StatusSet> {
    pub row: RecordId,
    pub current: S,
    highlighted: usize,
}

impl<S: StatusSet> StatusPicker<S> {
    pub fn new(row: RecordId, current: S) -> Self {
        Self {
            row,
            current,
            highlighted: current.position(),
        }
    }

    pub fn highlighted(&self) -> S {
        S::ALL[self.highlighted.min(S::ALL.len() - 1)]
    }

    pub fn next(&mut self) {
        self.highlighted = (self.highlighted + 1) % S::ALL.len();
    }

    pub fn previous(&mut self) {
        self.highlighted = (self.highlighted + S::ALL.len() - 1) % S::ALL.len();
    }

    /// The picked value, or `None` when it equals the current one.
    pub fn chosen(&self) -> Option<S> {
        let picked = self.highlighted();
        (picked != self.current).then_some(picked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Save,
    Cancel,
    /// Leave this row and edit the next (`true`) or previous one.
    StepRow(bool),
    Handled,
}

/// Shared key handling for an inline edit buffer.
pub fn edit_key(form: &mut Form, key: KeyEvent) -> EditKey {
    match key.code {
        KeyCode::Enter => return EditKey::Save,
        KeyCode::Esc => return EditKey::Cancel,
        KeyCode::PageDown => return EditKey::StepRow(true),
        KeyCode::PageUp => return EditKey::StepRow(false),
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
        KeyCode::Left => form.cycle(false),
        KeyCode::Right => form.cycle(true),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.input_char(c),
        _ => {}
    }
    EditKey::Handled
}
