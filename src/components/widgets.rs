//! Shared colors and drawing helpers for every screen.

use crate::forms::{FieldKind, Form};
use crate::models::{AppointmentStatus, QueueStatus, Role};
use crate::tui::Frame;
use ratatui::{prelude::*, widgets::*};

pub const BG: Color = Color::Rgb(16, 16, 28);
pub const PANEL: Color = Color::Rgb(22, 22, 35);
pub const BORDER: Color = Color::Rgb(75, 75, 120);
pub const TEXT: Color = Color::Rgb(220, 220, 240);
pub const TITLE: Color = Color::Rgb(230, 230, 250);
pub const HEADER_BG: Color = Color::Rgb(80, 60, 130);
pub const HIGHLIGHT: Color = Color::Rgb(250, 250, 110);
pub const SELECTED_BG: Color = Color::Rgb(40, 40, 60);
pub const HELP: Color = Color::Rgb(140, 140, 170);
pub const ERROR: Color = Color::Rgb(255, 100, 100);
pub const SUCCESS: Color = Color::Rgb(140, 255, 140);

/// Helper function to create a centered rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn fill_background(frame: &mut Frame, area: Rect) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), area);
}

/// Title bar with a bottom rule.
pub fn render_header(frame: &mut Frame, area: Rect, title: &str) {
    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(BG));
    frame.render_widget(header_block, area);

    let title = Paragraph::new(title.to_string())
        .style(
            Style::default()
                .fg(TITLE)
                .add_modifier(Modifier::BOLD)
                .bg(BG),
        )
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

pub fn render_help(frame: &mut Frame, area: Rect, text: &str) {
    let help = Paragraph::new(text.to_string())
        .style(Style::default().fg(HELP).bg(BG))
        .alignment(Alignment::Center);
    frame.render_widget(help, area);
}

/// Rounded panel with the standard border and background.
pub fn panel(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .title(title.into())
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(PANEL))
}

/// A centered message inside a panel, used for loading and empty states.
pub fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().fg(HELP))
        .alignment(Alignment::Center)
        .block(panel(title.to_string()));
    frame.render_widget(paragraph, area);
}

/// One-line red banner for a failed read.
pub fn render_error_banner(frame: &mut Frame, area: Rect, message: &str) {
    let banner = Paragraph::new(format!("Failed to load: {message}"))
        .style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(140, 30, 30))
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    frame.render_widget(banner, area);
}

pub fn table_header(columns: &[&str]) -> Row<'static> {
    let cells = columns
        .iter()
        .map(|h| Cell::from(h.to_string()).style(Style::default().fg(TITLE)));
    Row::new(cells).style(Style::default().bg(HEADER_BG)).height(1)
}

pub fn selected_style() -> Style {
    Style::default()
        .fg(HIGHLIGHT)
        .bg(SELECTED_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn queue_status_color(status: QueueStatus) -> Color {
    match status {
        QueueStatus::Waiting => Color::Yellow,
        QueueStatus::WithDoctor => Color::LightBlue,
        QueueStatus::Completed => Color::LightGreen,
    }
}

pub fn appointment_status_color(status: AppointmentStatus) -> Color {
    match status {
        AppointmentStatus::Booked => Color::Gray,
        AppointmentStatus::Completed => Color::Cyan,
        AppointmentStatus::Cancelled => Color::LightRed,
    }
}

pub fn role_color(role: Role) -> Color {
    match role {
        Role::Staff => Color::LightMagenta,
        Role::Patient => Color::LightCyan,
    }
}

/// A colored, bold status cell.
pub fn badge(label: &str, color: Color) -> Cell<'static> {
    Cell::from(Span::styled(
        format!(" {label} "),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Lines for every field of a form: the value, then its error if any.
/// Focus is only drawn when `active` is set.
pub fn form_lines(form: &Form, active: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, (spec, value)) in form.values().enumerate() {
        let focused = active && index == form.focus();
        let shown = match spec.kind {
            FieldKind::Secret => "•".repeat(value.chars().count()),
            FieldKind::Choice(_) => format!("< {value} >"),
            FieldKind::Lookup => {
                let label = form.lookup_label(value).unwrap_or(value);
                format!("< {label} >")
            }
            FieldKind::Text | FieldKind::Number => value.to_string(),
        };
        let shown = if value.is_empty() && !spec.placeholder.is_empty() {
            Span::styled(spec.placeholder.to_string(), Style::default().fg(HELP))
        } else {
            Span::styled(shown, Style::default().fg(TEXT))
        };
        let label_style = if focused {
            Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TITLE)
        };
        lines.push(Line::from(vec![
            Span::styled(if focused { "► " } else { "  " }, label_style),
            Span::styled(format!("{}: ", spec.label), label_style),
            shown,
        ]));
        if let Some(message) = form.error(spec.key) {
            lines.push(Line::from(Span::styled(
                format!("    {message}"),
                Style::default().fg(ERROR),
            )));
        }
    }
    lines
}

#[cfg(test)]
pub(crate) fn render_to_string(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> String {
    use ratatui::backend::TestBackend;

    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(draw).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FieldSpec, Rule};

    const SCHEMA: &[FieldSpec] = &[
        FieldSpec {
            key: "name",
            label: "Name",
            kind: FieldKind::Text,
            rules: &[Rule::MinLen(2, "Name must be at least 2 characters")],
            placeholder: "Full name",
        },
        FieldSpec {
            key: "password",
            label: "Password",
            kind: FieldKind::Secret,
            rules: &[],
            placeholder: "",
        },
    ];

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 20, outer);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
    }

    #[test]
    fn form_lines_mask_secrets_and_show_errors() {
        let mut form = Form::with_values(SCHEMA, &[("password", "hunter2".to_string())]);
        let _ = form.validate();
        let text: Vec<String> = form_lines(&form, true)
            .iter()
            .map(|line| line.to_string())
            .collect();

        assert!(text[0].contains("Name: Full name"));
        assert!(text[1].contains("Name must be at least 2 characters"));
        assert!(text[2].contains("•••••••"));
        assert!(!text[2].contains("hunter2"));
    }

    #[test]
    fn every_status_has_a_distinct_color() {
        let colors = [
            queue_status_color(QueueStatus::Waiting),
            queue_status_color(QueueStatus::WithDoctor),
            queue_status_color(QueueStatus::Completed),
        ];
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(
            appointment_status_color(AppointmentStatus::Booked),
            appointment_status_color(AppointmentStatus::Cancelled)
        );
    }
}
