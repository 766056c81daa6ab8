//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it.  The App event loop is the only
//! writer.

use podcraft_client::protocol::{Podcast, VoiceInfo};
use podcraft_client::StudioView;

use crate::action::Workspace;
use crate::recorder::RecorderStatus;
use crate::widgets::status_bar::InputMode;

/// Player position as reported by mpv property changes.
#[derive(Debug, Clone, Default)]
pub struct PlaybackInfo {
    pub time_pos_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub paused: bool,
    pub eof: bool,
}

impl PlaybackInfo {
    /// 0.0..=1.0, or 0.0 while the duration is unknown.
    pub fn progress(&self) -> f64 {
        match (self.time_pos_secs, self.duration_secs) {
            (Some(pos), Some(dur)) if dur > 0.0 => (pos / dur).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

pub struct AppState {
    pub backend_url: String,

    // ── Podcasts ────────────────────────────────────────────────────────────
    pub podcasts: Vec<Podcast>,
    pub podcasts_loaded: bool,
    /// Podcast the studio acts on (save transcript, generate audio).
    pub current_podcast: Option<Podcast>,

    // ── Studio ──────────────────────────────────────────────────────────────
    pub studio: StudioView,
    pub playback: PlaybackInfo,
    pub player_available: bool,

    // ── Voices ──────────────────────────────────────────────────────────────
    pub voices: VoiceInfo,
    pub voices_loaded: bool,
    pub recorder: RecorderStatus,
    /// Status line under the voice list ("Recording saved!", ...).
    pub recorder_message: Option<String>,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub workspace: Workspace,
    pub input_mode: InputMode,

    /// Advanced on every UI tick; drives spinner glyphs.
    pub spinner_frame: usize,

    /// Cached tail of the log file, refreshed while the log panel is open.
    pub log_lines: Vec<String>,
}

impl AppState {
    pub fn new(backend_url: String) -> Self {
        Self {
            backend_url,
            podcasts: Vec::new(),
            podcasts_loaded: false,
            current_podcast: None,
            studio: StudioView::new(),
            playback: PlaybackInfo::default(),
            player_available: false,
            voices: VoiceInfo::default(),
            voices_loaded: false,
            recorder: RecorderStatus::Idle,
            recorder_message: None,
            workspace: Workspace::Podcasts,
            input_mode: InputMode::Normal,
            spinner_frame: 0,
            log_lines: Vec::new(),
        }
    }

    pub fn current_podcast_id(&self) -> Option<&str> {
        self.current_podcast.as_ref().map(|p| p.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let mut info = PlaybackInfo::default();
        assert_eq!(info.progress(), 0.0);
        info.time_pos_secs = Some(30.0);
        info.duration_secs = Some(120.0);
        assert_eq!(info.progress(), 0.25);
        info.time_pos_secs = Some(500.0);
        assert_eq!(info.progress(), 1.0);
    }
}
