//! StudioView: the view-model the status poller drives.
//!
//! Holds the visibility of every named `Region`, the rendered script rows and
//! the audio source bound to the player.  Front-ends render from it; it has
//! no rendering surface of its own, so the rules can be checked in tests.

use tracing::{debug, error, warn};

use crate::poller::{PollerEvent, SubscriptionState};
use crate::protocol::{GenerationStatus, ScriptLine};
use crate::status::{Effect, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

/// One two-column transcript row: speaker name, spoken text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRow {
    pub speaker: String,
    pub text: String,
}

/// What the front-end has to do after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewUpdate {
    pub changed: bool,
    /// The player source changed; load this URL.
    pub load_audio: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudioView {
    regions: [Visibility; Region::ALL.len()],
    rows: Vec<ScriptRow>,
    audio_source: Option<String>,
    connection: Option<SubscriptionState>,
    last_status: Option<GenerationStatus>,
}

fn slot(region: Region) -> usize {
    match region {
        Region::Spinner => 0,
        Region::NotFound => 1,
        Region::ScriptLines => 2,
        Region::AudioProgress => 3,
        Region::StopIndicator => 4,
        Region::Transport => 5,
    }
}

impl StudioView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self, region: Region) -> Visibility {
        self.regions[slot(region)]
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.visibility(region) == Visibility::Visible
    }

    pub fn set_visible(&mut self, region: Region, visible: bool) -> bool {
        let new = if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        let changed = self.regions[slot(region)] != new;
        self.regions[slot(region)] = new;
        changed
    }

    /// Apply visibility effects in order.  Fetch effects are the poller's
    /// business and are skipped here.  Returns true if anything changed.
    pub fn apply(&mut self, effects: &[Effect]) -> bool {
        let mut changed = false;
        for effect in effects {
            changed |= match *effect {
                Effect::Show(region) => self.set_visible(region, true),
                Effect::Hide(region) => self.set_visible(region, false),
                Effect::Fetch(_) => false,
            };
        }
        changed
    }

    /// Clear the script region and rebuild it from `lines`, in order.
    pub fn render_script(&mut self, lines: &[ScriptLine]) {
        self.rows = lines
            .iter()
            .map(|l| ScriptRow {
                speaker: l.speaker.clone(),
                text: l.content.clone(),
            })
            .collect();
    }

    /// Bind the player to `url`, take down the generation indicators and
    /// reveal the transport.  Returns true when the source actually changed
    /// and the player has to reload.
    pub fn bind_audio(&mut self, url: &str) -> bool {
        self.set_visible(Region::AudioProgress, false);
        self.set_visible(Region::StopIndicator, false);
        self.set_visible(Region::Transport, true);
        if self.audio_source.as_deref() == Some(url) {
            return false;
        }
        self.audio_source = Some(url.to_string());
        true
    }

    /// Reset everything tied to the open podcast.
    pub fn clear(&mut self) {
        let connection = self.connection;
        *self = Self::default();
        self.connection = connection;
    }

    pub fn rows(&self) -> &[ScriptRow] {
        &self.rows
    }

    pub fn audio_source(&self) -> Option<&str> {
        self.audio_source.as_deref()
    }

    pub fn connection(&self) -> Option<SubscriptionState> {
        self.connection
    }

    pub fn last_status(&self) -> Option<&GenerationStatus> {
        self.last_status.as_ref()
    }

    pub fn apply_event(&mut self, event: &PollerEvent) -> ViewUpdate {
        match event {
            PollerEvent::Connection(state) => {
                let changed = self.connection != Some(*state);
                self.connection = Some(*state);
                ViewUpdate {
                    changed,
                    load_audio: None,
                }
            }
            PollerEvent::Status { status, effects } => {
                self.last_status = Some(*status);
                ViewUpdate {
                    changed: self.apply(effects),
                    load_audio: None,
                }
            }
            PollerEvent::ScriptLoaded(lines) => {
                debug!("view: rendering {} script lines", lines.len());
                self.render_script(lines);
                ViewUpdate {
                    changed: true,
                    load_audio: None,
                }
            }
            PollerEvent::AudioReady(url) => {
                let reload = self.bind_audio(url);
                ViewUpdate {
                    changed: true,
                    load_audio: reload.then(|| url.clone()),
                }
            }
            PollerEvent::AudioMissing => {
                error!("view: no audio URL found in response");
                ViewUpdate::default()
            }
            PollerEvent::FollowUpFailed { kind, message } => {
                warn!("view: {} fetch failed, keeping current view: {}", kind.label(), message);
                ViewUpdate::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::plan;

    fn status(gs: bool, sa: bool, gp: bool, pa: bool) -> GenerationStatus {
        GenerationStatus {
            is_generating_script: gs,
            is_script_available: sa,
            is_generating_podcast: gp,
            is_podcast_available: pa,
        }
    }

    fn push(view: &mut StudioView, s: GenerationStatus) -> ViewUpdate {
        view.apply_event(&PollerEvent::Status {
            status: s,
            effects: plan(&s),
        })
    }

    #[test]
    fn test_starts_hidden() {
        let view = StudioView::new();
        for region in Region::ALL {
            assert!(!view.is_visible(region));
        }
        assert!(view.rows().is_empty());
        assert!(view.audio_source().is_none());
    }

    #[test]
    fn test_script_regions_for_all_flag_combinations() {
        let cases = [
            ((false, false), [false, true, false]),
            ((true, false), [true, false, false]),
            ((false, true), [false, false, true]),
            ((true, true), [false, false, true]),
        ];
        for ((gs, sa), expected) in cases {
            let mut view = StudioView::new();
            push(&mut view, status(gs, sa, false, false));
            let got = [
                view.is_visible(Region::Spinner),
                view.is_visible(Region::NotFound),
                view.is_visible(Region::ScriptLines),
            ];
            assert_eq!(got, expected, "gs={} sa={}", gs, sa);
        }
    }

    #[test]
    fn test_repeated_status_is_idempotent() {
        let mut view = StudioView::new();
        let s = status(true, false, false, false);
        assert!(push(&mut view, s).changed);
        assert!(!push(&mut view, s).changed);
        assert!(view.is_visible(Region::Spinner));
    }

    #[test]
    fn test_script_rows_fully_replaced() {
        let mut view = StudioView::new();
        let first = vec![
            ScriptLine {
                speaker: "A".into(),
                content: "Hi".into(),
                ..Default::default()
            },
            ScriptLine {
                speaker: "B".into(),
                content: "Hello".into(),
                ..Default::default()
            },
        ];
        view.apply_event(&PollerEvent::ScriptLoaded(first));
        assert_eq!(view.rows().len(), 2);

        let second = vec![ScriptLine {
            speaker: "A".into(),
            content: "Hi".into(),
            ..Default::default()
        }];
        view.apply_event(&PollerEvent::ScriptLoaded(second.clone()));
        view.apply_event(&PollerEvent::ScriptLoaded(second));
        assert_eq!(
            view.rows(),
            &[ScriptRow {
                speaker: "A".into(),
                text: "Hi".into()
            }]
        );
    }

    #[test]
    fn test_generating_podcast_hides_transport() {
        let mut view = StudioView::new();
        view.bind_audio("http://x/a.wav");
        push(&mut view, status(false, false, true, false));
        assert!(view.is_visible(Region::AudioProgress));
        assert!(view.is_visible(Region::StopIndicator));
        assert!(!view.is_visible(Region::Transport));
    }

    #[test]
    fn test_transport_only_after_audio_url() {
        let mut view = StudioView::new();
        push(&mut view, status(false, false, true, false));
        push(&mut view, status(false, false, false, true));
        assert!(!view.is_visible(Region::AudioProgress));
        assert!(view.is_visible(Region::StopIndicator));
        assert!(!view.is_visible(Region::Transport));

        let update = view.apply_event(&PollerEvent::AudioReady("http://x/a.wav".into()));
        assert_eq!(update.load_audio.as_deref(), Some("http://x/a.wav"));
        assert!(view.is_visible(Region::Transport));
        assert!(!view.is_visible(Region::StopIndicator));
        assert!(!view.is_visible(Region::AudioProgress));
    }

    #[test]
    fn test_stop_marker_stays_until_url_is_bound() {
        let mut view = StudioView::new();
        push(&mut view, status(false, false, true, false));
        push(&mut view, status(false, false, false, true));
        view.apply_event(&PollerEvent::AudioMissing);
        push(&mut view, status(false, false, false, true));
        view.apply_event(&PollerEvent::AudioMissing);

        assert!(view.is_visible(Region::StopIndicator));
        assert!(!view.is_visible(Region::AudioProgress));
        assert!(!view.is_visible(Region::Transport));
    }

    #[test]
    fn test_missing_audio_leaves_transport_hidden() {
        let mut view = StudioView::new();
        push(&mut view, status(false, false, false, true));
        let update = view.apply_event(&PollerEvent::AudioMissing);
        assert!(!update.changed);
        assert!(!view.is_visible(Region::Transport));
        assert!(view.audio_source().is_none());
    }

    #[test]
    fn test_same_audio_url_does_not_reload() {
        let mut view = StudioView::new();
        let first = view.apply_event(&PollerEvent::AudioReady("http://x/a.wav".into()));
        let second = view.apply_event(&PollerEvent::AudioReady("http://x/a.wav".into()));
        assert!(first.load_audio.is_some());
        assert!(second.load_audio.is_none());
        let third = view.apply_event(&PollerEvent::AudioReady("http://x/b.wav".into()));
        assert_eq!(third.load_audio.as_deref(), Some("http://x/b.wav"));
    }

    #[test]
    fn test_failed_fetch_keeps_state() {
        let mut view = StudioView::new();
        push(&mut view, status(false, true, false, false));
        view.render_script(&[ScriptLine {
            speaker: "A".into(),
            content: "Hi".into(),
            ..Default::default()
        }]);
        view.apply_event(&PollerEvent::FollowUpFailed {
            kind: crate::status::FollowUpKind::Script,
            message: "500".into(),
        });
        assert_eq!(view.rows().len(), 1);
        assert!(view.is_visible(Region::ScriptLines));
    }

    #[test]
    fn test_clear_keeps_connection() {
        let mut view = StudioView::new();
        view.apply_event(&PollerEvent::Connection(SubscriptionState::Open));
        view.bind_audio("http://x/a.wav");
        view.clear();
        assert_eq!(view.connection(), Some(SubscriptionState::Open));
        assert!(view.audio_source().is_none());
        assert!(!view.is_visible(Region::Transport));
    }
}
