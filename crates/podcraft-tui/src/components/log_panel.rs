//! LogPanel component: tail of the log file, shown below the body.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ACCENT, C_BUSY, C_MUTED, C_SECONDARY},
    widgets::pane_chrome::pane_chrome_borders,
};

pub struct LogPanel {
    pub scroll: usize,
    pub borders: Borders,
    /// Follow new lines while scrolled to the bottom.
    follow: bool,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            borders: Borders::ALL,
            follow: true,
        }
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                self.follow = false;
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll += 1,
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                self.follow = false;
            }
            KeyCode::PageDown => self.scroll += 10,
            KeyCode::Home | KeyCode::Char('g') => {
                self.scroll = 0;
                self.follow = false;
            }
            KeyCode::End | KeyCode::Char('G') => self.follow = true,
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                self.follow = false;
            }
            MouseEventKind::ScrollDown => self.scroll += 1,
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ToggleLogs = action {
            self.follow = true;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);
        let block = pane_chrome_borders("log", None, focused, None, self.borders);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.log_lines;
        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let max_scroll = logs.len().saturating_sub(height);
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }

        let lines: Vec<Line> = logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|raw| {
                let compact = compact_log_line(raw);
                let color = if compact.contains(" ERROR ") {
                    C_ACCENT
                } else if compact.contains(" WARN ") {
                    C_BUSY
                } else {
                    C_SECONDARY
                };
                Line::from(Span::styled(format!(" {}", compact), Style::default().fg(color)))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

/// `2026-10-16T09:14:02.123Z  INFO podcraft::app: msg` → `09:14:02 INFO msg`.
pub fn compact_log_line(raw: &str) -> String {
    let clean = strip_ansi(raw);
    let mut rest = clean.trim();
    let mut head: Vec<&str> = Vec::new();

    if let Some((tok, rem)) = rest.split_once(char::is_whitespace) {
        if let Some(time) = time_of_day(tok) {
            head.push(time);
            rest = rem.trim_start();
        }
    }
    if let Some((tok, rem)) = rest.split_once(char::is_whitespace) {
        if matches!(tok, "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
            head.push(tok);
            rest = rem.trim_start();
        }
    }
    // module path prefix
    if let Some((left, msg)) = rest.split_once(": ") {
        if !left.is_empty()
            && left.len() <= 48
            && left
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'))
        {
            rest = msg;
        }
    }

    if head.is_empty() {
        rest.to_string()
    } else {
        format!("{} {}", head.join(" "), rest)
    }
}

/// `HH:MM:SS` out of an RFC 3339 timestamp.
fn time_of_day(token: &str) -> Option<&str> {
    let (date, time) = token.split_once('T')?;
    if date.len() != 10 || time.len() < 8 || !date.as_bytes()[4].eq(&b'-') {
        return None;
    }
    time.get(..8)
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ('@'..='~').contains(&ch) && ch != '[' {
                in_escape = false;
            }
            continue;
        }
        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compacts_tracing_line() {
        let raw = "2026-10-16T09:14:02.123456Z  INFO podcraft_client::poller: poller: status stream open";
        assert_eq!(compact_log_line(raw), "09:14:02 INFO poller: status stream open");
    }

    #[test]
    fn test_leaves_plain_text() {
        assert_eq!(compact_log_line("hello world"), "hello world");
    }

    #[test]
    fn test_strips_ansi() {
        assert_eq!(strip_ansi("\u{1b}[32mok\u{1b}[0m"), "ok");
    }
}
