//! Transient success and error notices.

use super::widgets::{ERROR, SUCCESS};
use crate::tui::Frame;
use ratatui::{prelude::*, widgets::*};
use std::time::{Duration, Instant};

/// How long a notice stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    shown_at: Instant,
}

/// Holds at most one notice; a newer one replaces the old.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Toast>,
}

impl Notifier {
    pub fn success(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Success, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Error, message.into());
    }

    fn show(&mut self, kind: ToastKind, message: String) {
        match kind {
            ToastKind::Success => tracing::info!(%message, "toast"),
            ToastKind::Error => tracing::warn!(%message, "toast"),
        }
        self.current = Some(Toast {
            kind,
            message,
            shown_at: Instant::now(),
        });
    }

    /// Drops the notice once it has been visible for [`TOAST_TTL`].
    pub fn expire(&mut self, now: Instant) {
        if let Some(toast) = &self.current {
            if now.saturating_duration_since(toast.shown_at) >= TOAST_TTL {
                self.current = None;
            }
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(toast) = self.current() else {
            return;
        };
        let (icon, color) = match toast.kind {
            ToastKind::Success => ("✓", SUCCESS),
            ToastKind::Error => ("✗", ERROR),
        };
        let paragraph = Paragraph::new(format!("{icon} {}", toast.message))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}
