//! VoiceList: built-in and cloned voices, plus the recorder status.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use podcraft_client::protocol::{VoiceFile, VoiceInfo};

use crate::{
    action::{Action, ComponentId, PromptKind},
    app_state::AppState,
    component::Component,
    recorder::RecorderStatus,
    theme::{C_MUTED, C_NUMBER_HINT, C_PRIMARY, C_RECORDING, C_SECONDARY, C_SELECTION_BG},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::{search_matches, ScrollableList},
    },
};

pub const EMPTY_CUSTOM_VOICES: &str = "Clone your voice to get started!";

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEntry {
    pub file: VoiceFile,
    pub custom: bool,
}

impl VoiceEntry {
    /// File name without the extension.
    pub fn name(&self) -> &str {
        let f = self.file.filename.as_str();
        f.rsplit_once('.').map_or(f, |(stem, _)| stem)
    }
}

pub struct VoiceList {
    pub list: ScrollableList<VoiceEntry>,
    has_custom: bool,
}

impl VoiceList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|v: &VoiceEntry, q: &str| search_matches(q, &v.file.filename)),
            has_custom: false,
        }
    }

    /// Built-in voices first, then custom ones.
    pub fn sync(&mut self, info: &VoiceInfo) {
        let builtin = info.voices.iter().map(|f| VoiceEntry {
            file: f.clone(),
            custom: false,
        });
        let custom = info.custom_voices.iter().map(|f| VoiceEntry {
            file: f.clone(),
            custom: true,
        });
        self.has_custom = !info.custom_voices.is_empty();
        self.list.set_items(builtin.chain(custom).collect());
    }
}

impl Component for VoiceList {
    fn id(&self) -> ComponentId {
        ComponentId::VoiceList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(v) = self.list.selected_item() {
                    return vec![Action::PreviewVoice(v.file.filepath.clone())];
                }
            }
            KeyCode::Char('d') => {
                if let Some(v) = self.list.selected_item().filter(|v| v.custom) {
                    return vec![Action::OpenPrompt(PromptKind::ConfirmDeleteVoice(
                        v.file.filepath.clone(),
                    ))];
                }
            }
            KeyCode::Char('a') => {
                if let Some(v) = self.list.selected_item() {
                    return vec![Action::OpenPrompt(PromptKind::AssignSpeaker(
                        v.name().to_string(),
                    ))];
                }
            }
            KeyCode::Char('R') => {
                if state.recorder == RecorderStatus::Idle {
                    return vec![Action::OpenPrompt(PromptKind::VoiceName)];
                }
                return vec![Action::ToggleRecording];
            }
            KeyCode::Char('r') => return vec![Action::RefreshVoices],
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let row = event.row.saturating_sub(area.y + 1) as usize;
                self.list.handle_click(row);
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = (state.recorder == RecorderStatus::Recording).then_some(Badge {
            text: "● REC",
            color: C_RECORDING,
        });
        let block = pane_chrome("voices", Some('3'), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        // last two rows: custom-voice hint and recorder status
        let footer_h: u16 = if self.has_custom { 1 } else { 2 };
        let list_h = inner.height.saturating_sub(footer_h) as usize;
        let list_area = Rect {
            height: list_h as u16,
            ..inner
        };

        if !state.voices_loaded {
            frame.render_widget(
                Paragraph::new(Span::styled("  loading voices…", Style::default().fg(C_MUTED))),
                list_area,
            );
        } else {
            self.list.ensure_visible(list_h);
            let sel = self.list.selected_in_view();
            let items: Vec<ListItem> = self
                .list
                .visible_items(list_h)
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let selected = row == sel;
                    let tag = if v.custom { "custom " } else { "       " };
                    let name_style = if selected {
                        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(C_SECONDARY)
                    };
                    let line = Line::from(vec![
                        Span::styled(format!("  {}", tag), Style::default().fg(C_NUMBER_HINT)),
                        Span::styled(v.name().to_string(), name_style),
                    ]);
                    let bg = if selected {
                        Style::default().bg(C_SELECTION_BG)
                    } else {
                        Style::default()
                    };
                    ListItem::new(line).style(bg)
                })
                .collect();
            frame.render_widget(List::new(items), list_area);
        }

        let mut footer = Vec::new();
        if !self.has_custom && state.voices_loaded {
            footer.push(Line::from(Span::styled(
                format!("  {}", EMPTY_CUSTOM_VOICES),
                Style::default().fg(C_MUTED),
            )));
        }
        let status = match state.recorder {
            RecorderStatus::Idle => state.recorder_message.clone().unwrap_or_default(),
            other => other.label().to_string(),
        };
        let status_color = if state.recorder == RecorderStatus::Recording {
            C_RECORDING
        } else {
            C_SECONDARY
        };
        footer.push(Line::from(Span::styled(
            format!("  {}", status),
            Style::default().fg(status_color),
        )));
        let footer_area = Rect {
            y: inner.y + list_h as u16,
            height: inner.height.saturating_sub(list_h as u16),
            ..inner
        };
        frame.render_widget(Paragraph::new(footer), footer_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn info() -> VoiceInfo {
        VoiceInfo {
            voices: vec![VoiceFile {
                filename: "alice.wav".into(),
                filepath: "voices/alice.wav".into(),
            }],
            custom_voices: vec![VoiceFile {
                filename: "me.wav".into(),
                filepath: "voices/custom/me.wav".into(),
            }],
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_builtin_voices_cannot_be_deleted() {
        let state = AppState::new("http://x".into());
        let mut c = VoiceList::new();
        c.sync(&info());
        assert!(c.handle_key(key('d'), &state).is_empty());
        c.handle_key(key('j'), &state);
        match c.handle_key(key('d'), &state).as_slice() {
            [Action::OpenPrompt(PromptKind::ConfirmDeleteVoice(path))] => {
                assert_eq!(path, "voices/custom/me.wav")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assign_uses_voice_name() {
        let state = AppState::new("http://x".into());
        let mut c = VoiceList::new();
        c.sync(&info());
        match c.handle_key(key('a'), &state).as_slice() {
            [Action::OpenPrompt(PromptKind::AssignSpeaker(name))] => assert_eq!(name, "alice"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_record_key_prompts_then_stops() {
        let mut state = AppState::new("http://x".into());
        let mut c = VoiceList::new();
        assert!(matches!(
            c.handle_key(key('R'), &state).as_slice(),
            [Action::OpenPrompt(PromptKind::VoiceName)]
        ));
        state.recorder = RecorderStatus::Recording;
        assert!(matches!(c.handle_key(key('R'), &state).as_slice(), [Action::ToggleRecording]));
    }

    #[test]
    fn test_name_strips_extension() {
        let v = VoiceEntry {
            file: VoiceFile {
                filename: "my.voice.wav".into(),
                filepath: String::new(),
            },
            custom: true,
        };
        assert_eq!(v.name(), "my.voice");
    }
}
