//! Action enum: user intents and internal events dispatched by the App.

use podcraft_client::protocol::Podcast;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    PodcastList,
    ScriptPane,
    AudioPlayer,
    VoiceList,
    LogPanel,
    HelpOverlay,
}

/// What a text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    PodcastTitle,
    Chapters,
    /// Name for the recording that is about to start.
    VoiceName,
    /// Speaker id the named voice is assigned to.
    AssignSpeaker(String),
    /// `y` deletes the podcast with this uuid.
    ConfirmDeletePodcast(String),
    /// `y` deletes the custom voice at this path.
    ConfirmDeleteVoice(String),
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::PodcastTitle => "new podcast title",
            Self::Chapters => "chapters (comma separated)",
            Self::VoiceName => "voice name",
            Self::AssignSpeaker(_) => "assign voice to speaker id",
            Self::ConfirmDeletePodcast(_) => "delete podcast? (y/n)",
            Self::ConfirmDeleteVoice(_) => "delete voice? (y/n)",
        }
    }
}

/// `y` or `yes`, any case.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Podcasts ─────────────────────────────────────────────────────────────
    RefreshPodcasts,
    OpenPodcast(Podcast),

    // ── Studio ───────────────────────────────────────────────────────────────
    SaveTranscript,
    GeneratePodcast,

    // ── Player ───────────────────────────────────────────────────────────────
    TogglePause,
    SeekRelative(f64),

    // ── Voices ───────────────────────────────────────────────────────────────
    RefreshVoices,
    PreviewVoice(String),
    ToggleRecording,

    // ── Prompt ───────────────────────────────────────────────────────────────
    OpenPrompt(PromptKind),
    PromptSubmitted(PromptKind, String),
    ClosePrompt,
    OpenFilter,
    CloseFilter,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    SwitchWorkspace(Workspace),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Resize(u16, u16),
}

/// Which workspace (tab) is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workspace {
    Podcasts,
    Studio,
    Voices,
}

impl Workspace {
    pub fn label(self) -> &'static str {
        match self {
            Self::Podcasts => "PODCASTS",
            Self::Studio => "STUDIO",
            Self::Voices => "VOICES",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_answers() {
        assert!(is_confirmation("y"));
        assert!(is_confirmation(" YES "));
        assert!(!is_confirmation(""));
        assert!(!is_confirmation("n"));
        assert!(!is_confirmation("yep"));
    }
}
