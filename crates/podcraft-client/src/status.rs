//! Status rules: how one `GenerationStatus` snapshot maps onto the studio.
//!
//! The rules are plain data (`RULES`), evaluated top to bottom on every
//! message.  They are not mutually exclusive: a later rule may rewrite a
//! region an earlier rule touched, and the last write wins.  Nothing here
//! remembers the previous message.
//!
//! ```text
//!  generating script            → spinner on, not-found off, lines off
//!  !generating && !available    → spinner off, not-found on, lines off
//!  script available             → spinner off, not-found off, lines on, fetch script
//!  generating podcast           → progress on, stop on, transport off
//!  podcast available            → progress off, fetch audio URL
//!
//! The stop indicator is only taken down once an audio URL is bound.
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::protocol::GenerationStatus;

/// A named area of the studio view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// "Generating script" spinner.
    Spinner,
    /// "No script found" message.
    NotFound,
    /// Rendered transcript rows.
    ScriptLines,
    /// Audio-generation progress animation.
    AudioProgress,
    /// Red stop marker shown from the start of audio generation until an
    /// audio URL is bound.
    StopIndicator,
    /// Player transport: play/pause, rewind, forward, progress.
    Transport,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Spinner,
        Region::NotFound,
        Region::ScriptLines,
        Region::AudioProgress,
        Region::StopIndicator,
        Region::Transport,
    ];
}

/// Data that becomes fetchable once the backend reports it available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUpKind {
    Script,
    AudioUrl,
}

impl FollowUpKind {
    pub const ALL: [FollowUpKind; 2] = [FollowUpKind::Script, FollowUpKind::AudioUrl];

    pub fn label(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::AudioUrl => "audio url",
        }
    }

    /// The availability flag for this kind in `status`.
    pub fn is_available(self, status: &GenerationStatus) -> bool {
        match self {
            Self::Script => status.is_script_available,
            Self::AudioUrl => status.is_podcast_available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Show(Region),
    Hide(Region),
    Fetch(FollowUpKind),
}

struct Rule {
    when: fn(&GenerationStatus) -> bool,
    effects: &'static [Effect],
}

const RULES: &[Rule] = &[
    Rule {
        when: |s| s.is_generating_script,
        effects: &[
            Effect::Show(Region::Spinner),
            Effect::Hide(Region::NotFound),
            Effect::Hide(Region::ScriptLines),
        ],
    },
    Rule {
        when: |s| !s.is_generating_script && !s.is_script_available,
        effects: &[
            Effect::Hide(Region::Spinner),
            Effect::Show(Region::NotFound),
            Effect::Hide(Region::ScriptLines),
        ],
    },
    Rule {
        when: |s| s.is_script_available,
        effects: &[
            Effect::Hide(Region::Spinner),
            Effect::Hide(Region::NotFound),
            Effect::Show(Region::ScriptLines),
            Effect::Fetch(FollowUpKind::Script),
        ],
    },
    Rule {
        when: |s| s.is_generating_podcast,
        effects: &[
            Effect::Show(Region::AudioProgress),
            Effect::Show(Region::StopIndicator),
            Effect::Hide(Region::Transport),
        ],
    },
    Rule {
        when: |s| s.is_podcast_available,
        effects: &[Effect::Hide(Region::AudioProgress), Effect::Fetch(FollowUpKind::AudioUrl)],
    },
];

/// Every effect of every matching rule, in rule order.
pub fn plan(status: &GenerationStatus) -> Vec<Effect> {
    RULES
        .iter()
        .filter(|rule| (rule.when)(status))
        .flat_map(|rule| rule.effects.iter().copied())
        .collect()
}

/// What to do with a snapshot that has both "generating" and "available"
/// set for the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Ignore the "available" flag of the conflicting pair.
    #[default]
    PreferGenerating,
    /// Ignore the "generating" flag of the conflicting pair.
    PreferAvailable,
    /// Drop the whole snapshot.
    Reject,
}

impl ConflictPolicy {
    /// Resolve conflicting flag pairs.  Returns `None` when the snapshot
    /// should be dropped.
    pub fn resolve(self, status: GenerationStatus) -> Option<GenerationStatus> {
        let script = status.script_conflict();
        let podcast = status.podcast_conflict();
        if !script && !podcast {
            return Some(status);
        }
        warn!(
            "status: conflicting flags (script={}, podcast={}), policy {:?}",
            script, podcast, self
        );

        let mut out = status;
        match self {
            Self::Reject => return None,
            Self::PreferGenerating => {
                if script {
                    out.is_script_available = false;
                }
                if podcast {
                    out.is_podcast_available = false;
                }
            }
            Self::PreferAvailable => {
                if script {
                    out.is_generating_script = false;
                }
                if podcast {
                    out.is_generating_podcast = false;
                }
            }
        }
        Some(out)
    }
}
