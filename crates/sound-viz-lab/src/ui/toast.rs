//! Toasts: transient lab notices plus the engine's live performance warnings.
//!
//! Engine warnings carry their own expiry and are drawn straight from the
//! snapshot; only lab notices are queued here.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use deck_proto::state::{PerformanceWarning, Severity};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use super::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_WARNING};

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, duration: Duration) {
        let msg = message.into();
        self.toasts.retain(|t| t.message != msg);
        self.toasts.push_back(Toast {
            message: msg,
            severity,
            expires: Instant::now() + duration,
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info, Duration::from_secs(2));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Critical, Duration::from_secs(5));
    }

    /// Remove expired toasts. Call each tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// Render engine warnings first, then notices, in the top-right corner of `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect, warnings: &[PerformanceWarning]) {
        let max_width = (area.width / 2).clamp(30, 60);
        let bottom = area.y + area.height;
        let mut y = area.y + 1;

        let rows = warnings
            .iter()
            .rev()
            .map(|w| (w.message.as_str(), w.severity))
            .chain(
                self.toasts
                    .iter()
                    .rev()
                    .take(self.max_visible)
                    .map(|t| (t.message.as_str(), t.severity)),
            );

        for (message, severity) in rows {
            if y >= bottom {
                break;
            }
            let msg_len = message.chars().count() as u16;
            let w = (msg_len + 4).min(max_width).min(area.width);
            let x = area.x + area.width.saturating_sub(w + 1);
            let toast_area = Rect {
                x,
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            let paragraph = Paragraph::new(Line::from(vec![Span::styled(
                format!(" {} {} ", icon(severity), message),
                Style::default()
                    .fg(color(severity))
                    .add_modifier(Modifier::BOLD),
            )]));
            frame.render_widget(paragraph, toast_area);
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

fn color(severity: Severity) -> Color {
    match severity {
        Severity::Info => C_TOAST_INFO,
        Severity::Warning => C_TOAST_WARNING,
        Severity::Critical => C_TOAST_ERROR,
    }
}

fn icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "·",
        Severity::Warning => "!",
        Severity::Critical => "✗",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut t = ToastManager::new();
        t.info("tier: low");
        t.info("tier: low");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_queue_is_capped() {
        let mut t = ToastManager::new();
        for i in 0..20 {
            t.info(format!("notice {}", i));
        }
        assert_eq!(t.len(), 8);
    }

    #[test]
    fn test_tick_drops_expired() {
        let mut t = ToastManager::new();
        t.push("gone", Severity::Info, Duration::ZERO);
        t.error("stays");
        t.tick();
        assert_eq!(t.len(), 1);
    }
}
