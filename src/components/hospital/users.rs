//! Staff and patient accounts.

use super::{list_title, move_edit, non_empty, render_edit_panel, save_edit, settle_edit, split_for_editor, PageLayout};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::commands::{Command, Mutation, MutationKind};
use crate::components::dialog::{CreateDialog, DialogEvent};
use crate::components::table::{edit_key, EditKey, RowCursor, RowEditor};
use crate::components::toast::Notifier;
use crate::components::widgets::{
    badge, panel, render_placeholder, role_color, selected_style, table_header, TEXT,
};
use crate::components::{Component, Page};
use crate::error::ClientError;
use crate::forms::{FieldKind, FieldSpec, Form, Rule};
use crate::models::{display_date, NewRecord, NewUser, Patch, RecordId, Resource, Role, StatusSet, User, UserPatch};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::Instant;

const ROLES: &[&str] = &["staff", "patient"];

const ADD_USER: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
        placeholder: "Full name",
    },
    FieldSpec {
        key: "email",
        label: "Email",
        kind: FieldKind::Text,
        rules: &[Rule::Email("Enter a valid email address")],
        placeholder: "name@hospital.org",
    },
    FieldSpec {
        key: "password",
        label: "Password",
        kind: FieldKind::Secret,
        rules: &[Rule::MinLen(6, "Password must be at least 6 characters")],
        placeholder: "",
    },
    FieldSpec {
        key: "role",
        label: "Role",
        kind: FieldKind::Choice(ROLES),
        rules: &[Rule::OneOf(ROLES, "Select a role")],
        placeholder: "",
    },
];

const EDIT_USER: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
        placeholder: "",
    },
    FieldSpec {
        key: "email",
        label: "Email",
        kind: FieldKind::Text,
        rules: &[Rule::Email("Enter a valid email address")],
        placeholder: "",
    },
    FieldSpec {
        key: "role",
        label: "Role",
        kind: FieldKind::Choice(ROLES),
        rules: &[Rule::OneOf(ROLES, "Select a role")],
        placeholder: "",
    },
    FieldSpec {
        key: "password",
        label: "New Password",
        kind: FieldKind::Secret,
        rules: &[Rule::MinLenIfPresent(6, "Password must be at least 6 characters")],
        placeholder: "leave blank to keep",
    },
];

fn add_user_defaults() -> Vec<(&'static str, String)> {
    vec![("role", Role::Staff.label().to_string())]
}

fn new_user(form: &Form) -> NewRecord {
    NewRecord::User(NewUser {
        name: form.value("name").trim().to_string(),
        email: form.value("email").trim().to_string(),
        password: form.value("password").to_string(),
        role: Role::from_label(form.value("role")).unwrap_or(Role::Staff),
    })
}

fn edit_form(user: &User) -> Form {
    Form::with_values(
        EDIT_USER,
        &[
            ("name", user.name.clone()),
            ("email", user.email.clone()),
            ("role", user.role.label().to_string()),
        ],
    )
}

fn user_patch(form: &Form) -> Patch {
    let password = form.value("password");
    Patch::User(UserPatch {
        name: non_empty(form, "name"),
        email: non_empty(form, "email"),
        role: Role::from_label(form.value("role")),
        password: (!password.is_empty()).then(|| password.to_string()),
    })
}

pub struct UsersPage {
    cursor: RowCursor,
    editor: RowEditor<Form>,
    dialog: CreateDialog,
    notifier: Notifier,
    deleting: Vec<RecordId>,
}

impl UsersPage {
    pub fn new() -> Self {
        Self {
            cursor: RowCursor::default(),
            editor: RowEditor::default(),
            dialog: CreateDialog::new("Add User", "Add User", "Adding...", ADD_USER, add_user_defaults),
            notifier: Notifier::default(),
            deleting: Vec::new(),
        }
    }
}

impl Component for UsersPage {
    fn handle_input(&mut self, key: KeyEvent, cache: &QueryCache) -> Result<Option<Action>> {
        if self.dialog.is_open() {
            return Ok(match self.dialog.handle_key(key) {
                Some(DialogEvent::Submitted) => {
                    Some(Action::Request(Command::Create(new_user(self.dialog.form()))))
                }
                Some(DialogEvent::Cancelled) | None => None,
            });
        }
        let rows = cache.users.data().unwrap_or_default();
        if let Some(form) = self.editor.buffer_mut() {
            return Ok(match edit_key(form, key) {
                EditKey::Save => save_edit(&mut self.editor, &mut self.notifier, user_patch),
                EditKey::Cancel => {
                    self.editor.cancel();
                    None
                }
                EditKey::StepRow(forward) => {
                    move_edit(&mut self.cursor, &mut self.editor, rows, forward, |user: &User| {
                        Some((user.id.clone(), edit_form(user)))
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
                if let Some(user) = selected {
                    self.editor.begin(user.id.clone(), edit_form(user));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(user) = selected.filter(|u| !self.deleting.contains(&u.id)) {
                    self.deleting.push(user.id.clone());
                    return Ok(Some(Action::Request(Command::Delete {
                        resource: Resource::Users,
                        id: user.id.clone(),
                    })));
                }
            }
            KeyCode::Char('a') => self.dialog.open(),
            KeyCode::Char('r') => return Ok(Some(Action::Refresh(Resource::Users))),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        let layout = PageLayout::new(area);
        layout.render_chrome(
            frame,
            "USERS",
            cache.users.error(),
            &self.notifier,
            "↑↓: Navigate | e: Edit | d: Delete | a: Add user | r: Refresh | 1-4: Pages | Esc: Back",
        );

        let (table_area, edit_area) = split_for_editor(layout.body, &self.editor);
        match cache.users.data() {
            None if cache.users.is_loading() => {
                render_placeholder(frame, table_area, " Users ", "Loading users...")
            }
            None => frame.render_widget(panel(" Users "), table_area),
            Some([]) => render_placeholder(frame, table_area, " Users (0) ", "No users found"),
            Some(rows) => {
                let table_rows = rows.iter().map(|user| {
                    let marker = if self.editor.is_saving(&user.id) || self.deleting.contains(&user.id) {
                        "… "
                    } else if self.editor.is_editing(&user.id) {
                        "✎ "
                    } else {
                        ""
                    };
                    Row::new(vec![
                        Cell::from(format!("{marker}{}", user.name)),
                        Cell::from(user.email.clone()),
                        badge(user.role.label(), role_color(user.role)),
                        Cell::from(display_date(user.created_at)),
                    ])
                    .style(Style::default().fg(TEXT))
                });
                let table = Table::new(
                    table_rows,
                    [
                        Constraint::Percentage(30),
                        Constraint::Percentage(35),
                        Constraint::Percentage(15),
                        Constraint::Percentage(20),
                    ],
                )
                .header(table_header(&["Name", "Email", "Role", "Joined"]))
                .block(panel(list_title("Users", rows.len(), cache.users.is_fetching())))
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

impl Page for UsersPage {
    fn resources(&self) -> &'static [Resource] {
        &[Resource::Users]
    }

    fn captures_input(&self) -> bool {
        self.dialog.is_open() || self.editor.editing().is_some()
    }

    fn sync(&mut self, cache: &QueryCache) {
        if let Some(rows) = cache.users.data() {
            self.cursor.clamp(rows.len());
        }
    }

    fn on_mutation(&mut self, mutation: &Mutation, result: &Result<(), ClientError>) {
        match &mutation.kind {
            MutationKind::Create => match result {
                Ok(()) => {
                    self.dialog.on_success();
                    self.notifier.success("User added");
                }
                Err(err) => {
                    self.dialog.on_failure();
                    self.notifier.error(err.to_string());
                }
            },
            MutationKind::Update(id) => {
                settle_edit(&mut self.editor, &mut self.notifier, id, result, "User updated");
            }
            MutationKind::Delete(id) => {
                self.deleting.retain(|row| row != id);
                match result {
                    Ok(()) => self.notifier.success("User deleted"),
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
    use crate::components::hospital::fixtures::{cache_with, user};
    use crate::components::toast::ToastKind;
    use crate::components::widgets::render_to_string;
    use crossterm::event::KeyModifiers;

    fn press(page: &mut UsersPage, cache: &QueryCache, code: KeyCode) -> Option<Action> {
        page.handle_input(KeyEvent::new(code, KeyModifiers::NONE), cache)
            .unwrap()
    }

    fn loaded() -> QueryCache {
        cache_with(vec![Listing::Users(vec![user("1", "Ada"), user("2", "Grace")])])
    }

    fn page_for(cache: &QueryCache) -> UsersPage {
        let mut page = UsersPage::new();
        page.sync(cache);
        page
    }

    #[test]
    fn server_error_keeps_row_editing_and_shows_message() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        press(&mut page, &cache, KeyCode::Tab);
        press(&mut page, &cache, KeyCode::Tab);
        press(&mut page, &cache, KeyCode::Right);

        let action = press(&mut page, &cache, KeyCode::Enter);
        assert_eq!(
            action,
            Some(Action::Request(Command::Update {
                id: RecordId::new("1"),
                patch: Patch::User(UserPatch {
                    name: Some("Ada".to_string()),
                    email: Some("ada@hospital.test".to_string()),
                    role: Some(Role::Patient),
                    password: None,
                }),
            }))
        );

        page.on_mutation(
            &Mutation {
                resource: Resource::Users,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Err(ClientError::Api {
                status: 500,
                message: "db unavailable".to_string(),
            }),
        );

        let toast = page.notifier.current().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "db unavailable");
        assert!(page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("role"), "patient");
    }

    #[test]
    fn paging_while_editing_moves_the_edit_to_the_next_row() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        press(&mut page, &cache, KeyCode::Char('x'));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Adax");

        press(&mut page, &cache, KeyCode::PageDown);
        assert!(page.editor.is_editing(&RecordId::new("2")));
        assert!(!page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Grace");

        press(&mut page, &cache, KeyCode::PageDown);
        assert!(page.editor.is_editing(&RecordId::new("1")));
        assert_eq!(page.editor.buffer().unwrap().value("name"), "Ada");
    }

    #[test]
    fn short_new_password_is_rejected() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        press(&mut page, &cache, KeyCode::BackTab);
        for c in "abc".chars() {
            press(&mut page, &cache, KeyCode::Char(c));
        }
        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        assert_eq!(
            page.editor.buffer().unwrap().error("password"),
            Some("Password must be at least 6 characters")
        );
        assert!(!page.editor.is_saving(&RecordId::new("1")));
    }

    #[test]
    fn successful_update_closes_editor() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('e'));
        press(&mut page, &cache, KeyCode::Enter);
        page.on_mutation(
            &Mutation {
                resource: Resource::Users,
                kind: MutationKind::Update(RecordId::new("1")),
            },
            &Ok(()),
        );
        assert!(page.editor.editing().is_none());
        assert!(!page.captures_input());
    }

    #[test]
    fn add_user_validates_email_and_password() {
        let cache = loaded();
        let mut page = page_for(&cache);
        press(&mut page, &cache, KeyCode::Char('a'));
        for c in "Linus".chars() {
            press(&mut page, &cache, KeyCode::Char(c));
        }
        press(&mut page, &cache, KeyCode::Tab);
        for c in "linus".chars() {
            press(&mut page, &cache, KeyCode::Char(c));
        }
        assert_eq!(press(&mut page, &cache, KeyCode::Enter), None);
        let form = page.dialog.form();
        assert_eq!(form.error("email"), Some("Enter a valid email address"));
        assert_eq!(form.error("password"), Some("Password must be at least 6 characters"));
        assert_eq!(form.error("role"), None);
    }

    #[test]
    fn table_shows_roles() {
        let cache = loaded();
        let page = page_for(&cache);
        let screen = render_to_string(120, 30, |f| {
            let area = f.area();
            page.render(f, area, &cache)
        });
        assert!(screen.contains("Users (2)"));
        assert!(screen.contains("grace@hospital.test"));
        assert!(screen.contains("staff"));
    }
}
