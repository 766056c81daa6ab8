//! Single-line text prompt, centred over the body.  Wraps tui-input.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::action::PromptKind;
use crate::theme::{style_focused_border, C_MUTED, C_PROMPT_BG, C_PROMPT_FG};

#[derive(Debug, PartialEq)]
pub enum PromptAction {
    Changed,
    Submitted(String),
    Cancelled,
}

pub struct Prompt {
    pub kind: PromptKind,
    input: Input,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: Input::default(),
        }
    }

    pub fn with_value(kind: PromptKind, value: &str) -> Self {
        Self {
            kind,
            input: Input::new(value.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptAction {
        match key.code {
            KeyCode::Esc => PromptAction::Cancelled,
            KeyCode::Enter => PromptAction::Submitted(self.input.value().trim().to_string()),
            _ => {
                self.input.handle_event(&Event::Key(key));
                PromptAction::Changed
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let width = (area.width * 2 / 3).clamp(20, 72).min(area.width);
        let rect = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + area.height.saturating_sub(3) / 2,
            width,
            height: 3.min(area.height),
        };
        frame.render_widget(Clear, rect);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_focused_border())
            .title(Span::styled(
                format!(" {} ", self.kind.title()),
                Style::default().fg(C_PROMPT_FG).add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(C_PROMPT_BG));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let scroll = self.input.visual_scroll(inner.width.saturating_sub(1) as usize);
        let text = if self.input.value().is_empty() {
            Span::styled("…", Style::default().fg(C_MUTED))
        } else {
            Span::styled(
                self.input.value().chars().skip(scroll).collect::<String>(),
                Style::default().fg(C_PROMPT_FG),
            )
        };
        frame.render_widget(Paragraph::new(Line::from(text)), inner);

        if inner.width > 0 {
            let cursor_x = inner.x + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(inner.x + inner.width - 1), inner.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_submit_trims() {
        let mut p = Prompt::new(PromptKind::PodcastTitle);
        for c in " Weekly ".chars() {
            assert_eq!(p.handle_key(key(KeyCode::Char(c))), PromptAction::Changed);
        }
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)),
            PromptAction::Submitted("Weekly".to_string())
        );
    }

    #[test]
    fn test_escape_cancels() {
        let mut p = Prompt::with_value(PromptKind::VoiceName, "unnamed_voice");
        assert_eq!(p.value(), "unnamed_voice");
        assert_eq!(p.handle_key(key(KeyCode::Esc)), PromptAction::Cancelled);
    }
}
