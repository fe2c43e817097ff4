//! Login screen.

use super::widgets::{centered_rect, fill_background, HELP};
use crate::app::Action;
use crate::cache::QueryCache;
use crate::components::Component;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use std::time::{Duration, Instant};

const USERNAME: usize = 0;
const PASSWORD: usize = 1;
const EXIT: usize = 2;

/// Represents the login UI component.
#[derive(Debug, Default)]
pub struct Login {
    username: String,
    password: String,
    /// Current selection (0: Username, 1: Password, 2: Exit)
    selected_index: usize,
    show_exit_dialog: bool,
    /// Selected option in the exit dialog (0: Yes, 1: No)
    exit_dialog_selected: usize,
    /// Set while the login request is in flight.
    pending: bool,
    error_message: Option<String>,
    error_message_time: Option<Instant>,
}

impl Login {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The login request failed.
    pub fn fail(&mut self, message: String) {
        self.pending = false;
        self.password.clear();
        self.set_error_message(message);
    }

    /// Shows a message on the next visit, e.g. after the session expired.
    pub fn notify(&mut self, message: String) {
        self.set_error_message(message);
    }

    /// Clears credentials after a successful login.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn clear_error_message(&mut self) {
        self.error_message = None;
        self.error_message_time = None;
    }

    fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
        self.error_message_time = Some(Instant::now());
    }

    /// Checks if the error message should be hidden (timeout).
    pub fn check_error_timeout(&mut self, now: Instant) {
        if let Some(time) = self.error_message_time {
            if now.saturating_duration_since(time) >= Duration::from_secs(5) {
                self.clear_error_message();
            }
        }
    }

    fn handle_exit_dialog_input(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.exit_dialog_selected = 1 - self.exit_dialog_selected;
            }
            KeyCode::Enter => {
                if self.exit_dialog_selected == 0 {
                    return Some(Action::Quit);
                }
                self.show_exit_dialog = false;
            }
            KeyCode::Esc => self.show_exit_dialog = false,
            _ => {}
        }
        None
    }

    fn submit(&mut self) -> Option<Action> {
        if self.pending {
            return None;
        }
        if self.username.trim().is_empty() {
            self.set_error_message("Username cannot be empty.".to_string());
            return None;
        }
        if self.password.is_empty() {
            self.set_error_message("Password cannot be empty.".to_string());
            return None;
        }
        self.pending = true;
        self.clear_error_message();
        Some(Action::Login {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

impl Component for Login {
    fn handle_input(&mut self, event: KeyEvent, _cache: &QueryCache) -> Result<Option<Action>> {
        if self.show_exit_dialog {
            return Ok(self.handle_exit_dialog_input(event));
        }

        match event.code {
            KeyCode::Char(c) if !self.pending => {
                match self.selected_index {
                    USERNAME => self.username.push(c),
                    PASSWORD => self.password.push(c),
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Backspace if !self.pending => {
                match self.selected_index {
                    USERNAME => {
                        self.username.pop();
                    }
                    PASSWORD => {
                        self.password.pop();
                    }
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Tab | KeyCode::Down => {
                self.selected_index = (self.selected_index + 1) % 3;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.selected_index = (self.selected_index + 2) % 3;
            }
            KeyCode::Enter => match self.selected_index {
                EXIT => {
                    self.show_exit_dialog = true;
                    self.exit_dialog_selected = 1;
                }
                USERNAME if self.password.is_empty() => self.selected_index = PASSWORD,
                _ => return Ok(self.submit()),
            },
            KeyCode::Esc => {
                self.show_exit_dialog = true;
                self.exit_dialog_selected = 1;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect, _cache: &QueryCache) {
        fill_background(frame, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Title
                Constraint::Length(1), // Slogan
                Constraint::Length(2), // Spacing
                Constraint::Length(1), // "Sign in"
                Constraint::Length(1), // Spacing
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(2), // Status or error
                Constraint::Length(1), // Exit
                Constraint::Min(0),
            ])
            .margin(1)
            .split(area);

        let title = Paragraph::new(Text::from(vec![
            Line::from("╔═════════════════════════════╗"),
            Line::from("║   R U S T O R I A   ADMIN   ║"),
            Line::from("╚═════════════════════════════╝"),
        ]))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(title, layout[0]);

        let slogan = Paragraph::new(Span::styled(
            "Queue, appointments, doctors and users in one console",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(slogan, layout[1]);

        let subtitle = Paragraph::new(Span::styled(
            "Sign in",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(subtitle, layout[3]);

        let field_area = |rect: Rect| centered_rect(60, 100, rect);

        let field_block = |title: &'static str, focused: bool| {
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title)
                .style(Style::default().fg(if focused { Color::Cyan } else { Color::White }))
        };

        let username = Paragraph::new(self.username.clone())
            .block(field_block(" Username ", self.selected_index == USERNAME));
        frame.render_widget(username, field_area(layout[5]));

        let password = Paragraph::new("•".repeat(self.password.chars().count()))
            .block(field_block(" Password ", self.selected_index == PASSWORD));
        frame.render_widget(password, field_area(layout[6]));

        let status = if self.is_pending() {
            Some(Paragraph::new("Signing in...").style(Style::default().fg(HELP)))
        } else {
            self.error_message()
                .map(|error| Paragraph::new(error.to_string()).style(Style::default().fg(Color::Red)))
        };
        if let Some(status) = status {
            frame.render_widget(status.alignment(Alignment::Center), layout[7]);
        }

        let exit_text = Paragraph::new(Span::styled(
            "Exit",
            Style::default()
                .fg(if self.selected_index == EXIT {
                    Color::Yellow
                } else {
                    Color::Gray
                })
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(exit_text, layout[8]);

        if self.show_exit_dialog {
            let dialog_area = centered_rect(60, 20, area);
            let dialog_block = Block::default()
                .title("Confirm Exit")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded);

            let text = vec![
                Line::from("Are you sure you want to quit?"),
                Line::from(""),
                Line::from(vec![
                    Span::styled(
                        " Yes ",
                        Style::default().fg(if self.exit_dialog_selected == 0 {
                            Color::Green
                        } else {
                            Color::DarkGray
                        }),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        " No ",
                        Style::default().fg(if self.exit_dialog_selected == 1 {
                            Color::Red
                        } else {
                            Color::DarkGray
                        }),
                    ),
                ]),
            ];

            let dialog_paragraph = Paragraph::new(text)
                .block(dialog_block)
                .alignment(Alignment::Center);

            frame.render_widget(Clear, dialog_area);
            frame.render_widget(dialog_paragraph, dialog_area);
        }
    }
}
