//! AudioPlayer pane: busy indicator while audio is generated, transport
//! controls once a source is bound.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use podcraft_client::{Region, StudioView};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ACCENT, C_BUSY, C_MUTED, C_PLAYING, C_PRIMARY},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        progress_bar::draw_progress,
        toast::spinner_glyph,
    },
};

/// Which of the audio pane's states the view currently selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDisplay {
    /// Progress animation, with the stop marker while it is visible.
    Generating { stop: bool },
    /// Generation finished but no URL bound yet: stop marker only.
    Stopped,
    Transport,
    Empty,
}

impl AudioDisplay {
    pub fn of(view: &StudioView) -> Self {
        let stop = view.is_visible(Region::StopIndicator);
        if view.is_visible(Region::AudioProgress) {
            Self::Generating { stop }
        } else if view.is_visible(Region::Transport) {
            Self::Transport
        } else if stop {
            Self::Stopped
        } else {
            Self::Empty
        }
    }
}

pub struct AudioPlayer {
    seek_step: f64,
}

impl AudioPlayer {
    pub fn new(seek_step: f64) -> Self {
        Self { seek_step }
    }
}

impl Component for AudioPlayer {
    fn id(&self) -> ComponentId {
        ComponentId::AudioPlayer
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if !state.studio.is_visible(Region::Transport) {
            return vec![];
        }
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => vec![Action::TogglePause],
            KeyCode::Left => vec![Action::SeekRelative(-self.seek_step)],
            KeyCode::Right => vec![Action::SeekRelative(self.seek_step)],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let display = AudioDisplay::of(&state.studio);
        let badge = if let AudioDisplay::Generating { .. } = display {
            Some(Badge {
                text: "BUSY",
                color: C_BUSY,
            })
        } else if !state.player_available {
            Some(Badge {
                text: "NO MPV",
                color: C_ACCENT,
            })
        } else {
            None
        };
        let block = pane_chrome("audio", None, focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let stop_marker = Span::styled("■", Style::default().fg(C_ACCENT));
        match display {
            AudioDisplay::Transport => {}
            AudioDisplay::Generating { stop } => {
                let mut spans = vec![
                    Span::styled(
                        format!("  {} ", spinner_glyph(state.spinner_frame)),
                        Style::default().fg(C_BUSY),
                    ),
                    Span::styled("generating audio  ", Style::default().fg(C_MUTED)),
                ];
                if stop {
                    spans.push(stop_marker);
                }
                frame.render_widget(Paragraph::new(Line::from(spans)), inner);
                return;
            }
            AudioDisplay::Stopped => {
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::raw("  "),
                        stop_marker,
                        Span::styled("  audio generated, waiting for its URL", Style::default().fg(C_MUTED)),
                    ])),
                    inner,
                );
                return;
            }
            AudioDisplay::Empty => {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        "  no audio yet, press p in the script pane to generate it",
                        Style::default().fg(C_MUTED),
                    )),
                    inner,
                );
                return;
            }
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let pb = &state.playback;
        let (glyph, color) = if pb.eof {
            ("■", C_MUTED)
        } else if pb.paused {
            ("▶", C_PRIMARY)
        } else {
            ("⏸", C_PLAYING)
        };
        let step = self.seek_step.round() as i64;
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("  «{}  ", step), Style::default().fg(C_MUTED)),
                Span::styled(glyph, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}»", step), Style::default().fg(C_MUTED)),
            ])),
            rows[0],
        );

        let bar_area = Rect {
            x: rows[1].x + 2,
            width: rows[1].width.saturating_sub(4),
            ..rows[1]
        };
        draw_progress(frame, bar_area, pb.progress(), pb.time_pos_secs, pb.duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcraft_client::PollerEvent;
    use ratatui::crossterm::event::KeyModifiers;

    #[test]
    fn test_keys_need_a_bound_source() {
        let mut state = AppState::new("http://x".into());
        let mut c = AudioPlayer::new(10.0);
        let right = KeyEvent::new(KeyCode::Right, KeyModifiers::NONE);
        assert!(c.handle_key(right, &state).is_empty());

        state
            .studio
            .apply_event(&PollerEvent::AudioReady("http://x/a.wav".into()));
        match c.handle_key(right, &state).as_slice() {
            [Action::SeekRelative(s)] => assert_eq!(*s, 10.0),
            other => panic!("unexpected {:?}", other),
        }
        let left = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert!(matches!(
            c.handle_key(left, &state).as_slice(),
            [Action::SeekRelative(s)] if *s == -10.0
        ));
    }

    #[test]
    fn test_stop_marker_survives_missing_url() {
        use podcraft_client::status::plan;
        use podcraft_client::GenerationStatus;

        let mut state = AppState::new("http://x".into());
        let mut push = |gp: bool, pa: bool| {
            let status = GenerationStatus {
                is_generating_podcast: gp,
                is_podcast_available: pa,
                ..Default::default()
            };
            state.studio.apply_event(&PollerEvent::Status {
                status,
                effects: plan(&status),
            });
        };
        push(true, false);
        push(false, true);
        state.studio.apply_event(&PollerEvent::AudioMissing);
        assert_eq!(AudioDisplay::of(&state.studio), AudioDisplay::Stopped);

        state
            .studio
            .apply_event(&PollerEvent::AudioReady("http://x/a.wav".into()));
        assert_eq!(AudioDisplay::of(&state.studio), AudioDisplay::Transport);
    }
}
