//! ScriptPane: the transcript side of the Studio workspace.
//!
//! Renders exactly one of the spinner, "not found" and script-rows regions,
//! whichever `StudioView` marks visible.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use podcraft_client::{Region, StudioView};

use crate::{
    action::{Action, ComponentId, PromptKind},
    app_state::AppState,
    component::Component,
    theme::{C_BUSY, C_MUTED, C_PRIMARY, C_SPEAKER},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        toast::spinner_glyph,
    },
};

const MAX_SPEAKER_COL: usize = 16;

/// What the pane shows, derived from region visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDisplay {
    Waiting,
    Generating,
    NotFound,
    Lines,
}

impl ScriptDisplay {
    pub fn of(view: &StudioView) -> Self {
        if view.is_visible(Region::Spinner) {
            Self::Generating
        } else if view.is_visible(Region::ScriptLines) {
            Self::Lines
        } else if view.is_visible(Region::NotFound) {
            Self::NotFound
        } else {
            Self::Waiting
        }
    }
}

pub struct ScriptPane {
    scroll: u16,
}

impl ScriptPane {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    fn script_lines(view: &StudioView) -> Vec<Line<'static>> {
        let col = view
            .rows()
            .iter()
            .map(|r| r.speaker.width())
            .max()
            .unwrap_or(0)
            .min(MAX_SPEAKER_COL);
        view.rows()
            .iter()
            .map(|r| {
                Line::from(vec![
                    Span::styled(
                        format!(" {:<width$}  ", r.speaker, width = col),
                        Style::default().fg(C_SPEAKER).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(r.text.clone(), Style::default().fg(C_PRIMARY)),
                ])
            })
            .collect()
    }
}

impl Component for ScriptPane {
    fn id(&self) -> ComponentId {
        ComponentId::ScriptPane
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home => self.scroll = 0,
            KeyCode::Char('g') => return vec![Action::OpenPrompt(PromptKind::Chapters)],
            KeyCode::Char('s') => return vec![Action::SaveTranscript],
            KeyCode::Char('p') => return vec![Action::GeneratePodcast],
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::OpenPodcast(_) = action {
            self.scroll = 0;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = state
            .current_podcast
            .as_ref()
            .map(|p| p.title.as_str())
            .unwrap_or("script");
        let display = ScriptDisplay::of(&state.studio);
        let badge = (display == ScriptDisplay::Generating).then_some(Badge {
            text: "GENERATING",
            color: C_BUSY,
        });
        let block = pane_chrome(title, None, focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let muted = |msg: String| Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED)));
        match display {
            ScriptDisplay::Waiting => {
                frame.render_widget(muted("  waiting for generation status…".into()), inner)
            }
            ScriptDisplay::Generating => frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(
                        format!("  {} ", spinner_glyph(state.spinner_frame)),
                        Style::default().fg(C_BUSY),
                    ),
                    Span::styled("generating script…", Style::default().fg(C_MUTED)),
                ])),
                inner,
            ),
            ScriptDisplay::NotFound => frame.render_widget(
                muted("  No script found. Press g to generate one.".into()),
                inner,
            ),
            ScriptDisplay::Lines => {
                let lines = Self::script_lines(&state.studio);
                let max = (lines.len() as u16).saturating_sub(1);
                self.scroll = self.scroll.min(max);
                frame.render_widget(
                    Paragraph::new(lines)
                        .wrap(Wrap { trim: false })
                        .scroll((self.scroll, 0)),
                    inner,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcraft_client::status::plan;
    use podcraft_client::{GenerationStatus, PollerEvent};
    use ratatui::crossterm::event::KeyModifiers;

    fn view_for(gs: bool, sa: bool) -> StudioView {
        let status = GenerationStatus {
            is_generating_script: gs,
            is_script_available: sa,
            ..Default::default()
        };
        let mut view = StudioView::new();
        view.apply_event(&PollerEvent::Status {
            status,
            effects: plan(&status),
        });
        view
    }

    #[test]
    fn test_display_follows_regions() {
        assert_eq!(ScriptDisplay::of(&StudioView::new()), ScriptDisplay::Waiting);
        assert_eq!(ScriptDisplay::of(&view_for(true, false)), ScriptDisplay::Generating);
        assert_eq!(ScriptDisplay::of(&view_for(false, false)), ScriptDisplay::NotFound);
        assert_eq!(ScriptDisplay::of(&view_for(false, true)), ScriptDisplay::Lines);
        assert_eq!(ScriptDisplay::of(&view_for(true, true)), ScriptDisplay::Lines);
    }

    #[test]
    fn test_studio_keys() {
        let state = AppState::new("http://x".into());
        let mut pane = ScriptPane::new();
        let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        assert!(matches!(
            pane.handle_key(key('g'), &state).as_slice(),
            [Action::OpenPrompt(PromptKind::Chapters)]
        ));
        assert!(matches!(pane.handle_key(key('s'), &state).as_slice(), [Action::SaveTranscript]));
        assert!(matches!(pane.handle_key(key('p'), &state).as_slice(), [Action::GeneratePodcast]));
    }
}
