//! Dashboard shown after login: one card per resource plus logout.

use super::widgets::{
    centered_rect, fill_background, render_header, render_help, BORDER, HELP, HIGHLIGHT, PANEL,
    SELECTED_BG, TEXT, TITLE,
};
use crate::app::Action;
use crate::cache::{FetchStatus, QueryCache};
use crate::components::Component;
use crate::models::Resource;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph},
};

const LOGOUT: usize = Resource::ALL.len();

#[derive(Debug, Default)]
pub struct Home {
    username: Option<String>,
    selected: usize,
    show_logout_dialog: bool,
    /// Selected option in the logout dialog (0: Yes, 1: No)
    logout_dialog_selected: usize,
}

fn description(resource: Resource) -> &'static str {
    match resource {
        Resource::Queue => "Track walk-in patients and move them through the queue",
        Resource::Appointments => "Book, complete, cancel and reschedule appointments",
        Resource::Users => "Manage staff and patient accounts",
        Resource::Doctors => "Maintain the doctor roster and availability",
    }
}

/// Short count line for a dashboard card.
fn summary(cache: &QueryCache, resource: Resource) -> String {
    match (cache.len(resource), cache.status(resource)) {
        (Some(n), _) => format!("{n} records"),
        (None, FetchStatus::Failed(_)) => "Unavailable".to_string(),
        (None, _) => "Loading...".to_string(),
    }
}

impl Home {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    fn handle_logout_dialog_input(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.logout_dialog_selected = 1 - self.logout_dialog_selected;
            }
            KeyCode::Enter => {
                self.show_logout_dialog = false;
                if self.logout_dialog_selected == 0 {
                    return Some(Action::Logout);
                }
            }
            KeyCode::Esc => self.show_logout_dialog = false,
            _ => {}
        }
        None
    }

    fn open_logout_dialog(&mut self) {
        self.show_logout_dialog = true;
        self.logout_dialog_selected = 1;
    }
}

impl Component for Home {
    fn handle_input(&mut self, key: KeyEvent, _cache: &QueryCache) -> Result<Option<Action>> {
        if self.show_logout_dialog {
            return Ok(self.handle_logout_dialog_input(key));
        }

        match key.code {
            KeyCode::Down | KeyCode::Tab | KeyCode::Right => {
                self.selected = (self.selected + 1) % (LOGOUT + 1);
            }
            KeyCode::Up | KeyCode::BackTab | KeyCode::Left => {
                self.selected = (self.selected + LOGOUT) % (LOGOUT + 1);
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                return Ok(Some(Action::Open(Resource::ALL[index])));
            }
            KeyCode::Enter => match Resource::ALL.get(self.selected) {
                Some(resource) => return Ok(Some(Action::Open(*resource))),
                None => self.open_logout_dialog(),
            },
            KeyCode::Esc => self.open_logout_dialog(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
        fill_background(frame, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(2), // Welcome
                Constraint::Min(10),   // Cards
                Constraint::Length(3), // Logout
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(area);

        render_header(frame, layout[0], "RUSTORIA ADMIN DASHBOARD");

        let welcome = match &self.username {
            Some(name) => format!("Welcome, {name}"),
            None => "Welcome".to_string(),
        };
        frame.render_widget(
            Paragraph::new(welcome)
                .style(Style::default().fg(TEXT))
                .alignment(Alignment::Center),
            layout[1],
        );

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[2]);
        let cells: Vec<Rect> = rows
            .iter()
            .flat_map(|row| {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .split(*row)
                    .to_vec()
            })
            .collect();

        for (index, (resource, cell)) in Resource::ALL.iter().zip(cells).enumerate() {
            let selected = index == self.selected;
            let block = Block::default()
                .title(format!(" {} {} ", index + 1, resource.title()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(if selected { HIGHLIGHT } else { BORDER }))
                .style(Style::default().bg(if selected { SELECTED_BG } else { PANEL }))
                .padding(Padding::horizontal(1));
            let body = Paragraph::new(vec![
                Line::from(Span::styled(
                    summary(cache, *resource),
                    Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(description(*resource), Style::default().fg(HELP))),
            ])
            .block(block)
            .wrap(ratatui::widgets::Wrap { trim: true });
            frame.render_widget(body, cell);
        }

        let logout_selected = self.selected == LOGOUT;
        let logout = Paragraph::new(if logout_selected {
            "[ Logout ]"
        } else {
            "  Logout  "
        })
        .style(
            Style::default()
                .fg(if logout_selected { HIGHLIGHT } else { TEXT })
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER)),
        );
        frame.render_widget(logout, centered_rect(30, 100, layout[3]));

        render_help(
            frame,
            layout[4],
            "↑↓: Navigate | 1-4: Open | Enter: Select | Esc: Logout | Ctrl+Q: Quit",
        );

        if self.show_logout_dialog {
            self.render_logout_dialog(frame, area);
        }
    }
}

impl Home {
    fn render_logout_dialog(&self, frame: &mut Frame, area: Rect) {
        let dialog_area = centered_rect(40, 20, area);
        frame.render_widget(Clear, dialog_area);

        let yes_style = if self.logout_dialog_selected == 0 {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let no_style = if self.logout_dialog_selected == 1 {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let text = vec![
            Line::from("Are you sure you want to logout?"),
            Line::from(""),
            Line::from(vec![
                Span::styled(" Yes ", yes_style),
                Span::raw("  "),
                Span::styled(" No ", no_style),
            ]),
        ];
        let dialog = Paragraph::new(text)
            .style(Style::default().fg(TEXT))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(" Confirm Logout ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(HIGHLIGHT))
                    .style(Style::default().bg(PANEL)),
            );
        frame.render_widget(dialog, dialog_area);
    }
}
