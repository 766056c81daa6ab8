//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks:
//!   terminal input, the status poller, mpv, and finished REST calls.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use podcraft_client::protocol::{Podcast, ScriptRequest, VoiceAssignment, VoiceInfo};
use podcraft_client::{
    ApiError, Config, PodcraftApi, PollerEvent, PollerHandle, StatusPoller, SubscriptionState,
};

use crate::{
    action::{is_confirmation, Action, ComponentId, PromptKind, Workspace},
    app_state::{AppState, PlaybackInfo},
    component::Component,
    components::{
        audio_player::AudioPlayer, help_overlay::HelpOverlay, log_panel::LogPanel,
        podcast_list::PodcastList, script_pane::ScriptPane, voice_list::VoiceList,
    },
    player::{Player, PlayerEvent},
    recorder::{self, RecorderError, RecorderStatus, Recording},
    widgets::{
        prompt::{Prompt, PromptAction},
        status_bar::{self, InputMode},
        toast::{Severity, ToastManager},
    },
    workspace::WorkspaceManager,
};

/// Height of the transport pane under the script in the studio.
const TRANSPORT_HEIGHT: u16 = 4;
const LOG_PANEL_HEIGHT: u16 = 10;
const LOG_TAIL_LINES: usize = 500;

/// Messages sent into the App event loop from background tasks.
pub enum AppMessage {
    Event(Event),
    Poller(PollerEvent),
    Player(PlayerEvent),
    PlayerStarted(anyhow::Result<Player>),
    RecordingStarted(Result<Recording, RecorderError>, String),
    PodcastsLoaded(Result<Vec<Podcast>, String>),
    VoicesLoaded(Result<VoiceInfo, String>),
    FormDone(Form, Result<(), String>),
}

/// One-shot backend calls started from the UI.  Each has a fixed success
/// and failure text; a `detail` from the backend replaces the failure text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    CreatePodcast,
    DeletePodcast,
    GenerateScript,
    SaveTranscript,
    GeneratePodcast,
    UploadVoice,
    DeleteVoice,
    AssignVoice,
}

impl Form {
    pub fn success_text(self) -> &'static str {
        match self {
            Self::CreatePodcast => "Podcast created",
            Self::DeletePodcast => "Podcast deleted",
            Self::GenerateScript => "Generating podcast script",
            Self::SaveTranscript => "Transcript updated successfully!",
            Self::GeneratePodcast => "Podcast generation started",
            Self::UploadVoice => "Recording saved!",
            Self::DeleteVoice => "Voice deleted",
            Self::AssignVoice => "Voice assigned",
        }
    }

    pub fn error_text(self) -> &'static str {
        match self {
            Self::CreatePodcast => "Error creating podcast.",
            Self::DeletePodcast => "Error deleting podcast.",
            Self::GenerateScript => "Error generating podcast script!!",
            Self::SaveTranscript => "Error updating transcript.",
            Self::GeneratePodcast => "Error generating podcast.",
            Self::UploadVoice => "Error saving recording.",
            Self::DeleteVoice => "Error deleting voice.",
            Self::AssignVoice => "Error assigning voice.",
        }
    }

    /// Text of the spinner toast shown while the call is in flight.
    fn pending_text(self) -> Option<&'static str> {
        match self {
            Self::GenerateScript => Some("Submitting chapters"),
            Self::GeneratePodcast => Some("Starting podcast generation"),
            Self::UploadVoice => Some("Processing recording..."),
            _ => None,
        }
    }

    fn refreshes_podcasts(self) -> bool {
        matches!(self, Self::CreatePodcast | Self::DeletePodcast)
    }

    fn refreshes_voices(self) -> bool {
        matches!(self, Self::UploadVoice | Self::DeleteVoice)
    }
}

/// Alerts once about a null audio URL.  The backend keeps reporting the
/// podcast available, so the same `AudioMissing` repeats on every snapshot;
/// only a bound URL or a new generation run re-arms the alert.
#[derive(Debug, Default)]
struct MissingAudioNotice {
    reported: bool,
}

impl MissingAudioNotice {
    fn should_alert(&mut self, event: &PollerEvent) -> bool {
        match event {
            PollerEvent::AudioMissing => !std::mem::replace(&mut self.reported, true),
            PollerEvent::AudioReady(_) => {
                self.reported = false;
                false
            }
            PollerEvent::Status { status, .. } if status.is_generating_podcast => {
                self.reported = false;
                false
            }
            _ => false,
        }
    }
}

/// Screen rects of the panes, recorded each frame for mouse hit-testing.
#[derive(Debug, Clone, Default)]
struct PaneAreas {
    podcast_list: Rect,
    script_pane: Rect,
    audio_player: Rect,
    voice_list: Rect,
    log_panel: Rect,
}

pub struct App {
    config: Config,
    api: PodcraftApi,
    log_path: PathBuf,

    state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    podcast_list: PodcastList,
    script_pane: ScriptPane,
    audio_player: AudioPlayer,
    voice_list: VoiceList,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    // ── Infrastructure ───────────────────────────────────────────────────────
    wm: WorkspaceManager,
    toast: ToastManager,
    prompt: Option<Prompt>,
    pane_areas: PaneAreas,
    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,

    // ── Background resources ─────────────────────────────────────────────────
    poller: Option<PollerHandle>,
    player: Option<Player>,
    /// URL mpv currently has loaded.  Differs from the studio source after a
    /// voice preview.
    player_source: Option<String>,
    /// Capture in progress and the name it will be uploaded under.
    recording: Option<(Recording, String)>,
    missing_audio: MissingAudioNotice,

    should_quit: bool,
}

impl App {
    pub fn new(config: Config, log_path: PathBuf) -> anyhow::Result<Self> {
        let api = PodcraftApi::new(&config.server)?;
        let state = AppState::new(api.base_url().to_string());
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);
        let seek_step = config.player.seek_step_secs;

        Ok(Self {
            config,
            api,
            log_path,
            state,
            podcast_list: PodcastList::new(),
            script_pane: ScriptPane::new(),
            audio_player: AudioPlayer::new(seek_step),
            voice_list: VoiceList::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            wm: WorkspaceManager::new(),
            toast: ToastManager::new(),
            prompt: None,
            pane_areas: PaneAreas::default(),
            tx,
            rx: Some(rx),
            poller: None,
            player: None,
            player_source: None,
            recording: None,
            missing_audio: MissingAudioNotice::default(),
            should_quit: false,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("app already running"))?;

        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: status stream (poller → AppMessage) ──────────────
        let (poll_tx, mut poll_rx) = mpsc::channel::<PollerEvent>(64);
        self.poller = Some(StatusPoller::spawn(
            self.api.clone(),
            self.config.stream.clone(),
            poll_tx,
        ));
        let fwd_tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = poll_rx.recv().await {
                if fwd_tx.send(AppMessage::Poller(ev)).await.is_err() {
                    break;
                }
            }
        });

        // ── Background task: mpv startup and its property events ─────────────
        let (player_tx, mut player_rx) = mpsc::channel::<PlayerEvent>(256);
        let player_config = self.config.player.clone();
        let started_tx = self.tx.clone();
        tokio::spawn(async move {
            let result = Player::start(&player_config, player_tx).await;
            let _ = started_tx.send(AppMessage::PlayerStarted(result)).await;
        });
        let fwd_tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = player_rx.recv().await {
                if fwd_tx.send(AppMessage::Player(ev)).await.is_err() {
                    break;
                }
            }
        });

        self.refresh_podcasts();
        self.refresh_voices();

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry + spinner animation.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // podcraft.log tail refresh: every 2s, only when log panel is open
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    self.state.spinner_frame = self.state.spinner_frame.wrapping_add(1);
                    needs_redraw = true;
                }

                _ = log_refresh.tick() => {
                    if self.wm.show_log_panel {
                        self.reload_log();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        if let Some(poller) = self.poller.take() {
            poller.close();
        }
        if let Some(mut player) = self.player.take() {
            player.shutdown().await;
        }
        // An unfinished recording is discarded with its capture thread.
        self.recording = None;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("podcraft exiting");

        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                }
                _ => return false,
            },

            AppMessage::Poller(event) => {
                if event == PollerEvent::Connection(SubscriptionState::Closed) && !self.should_quit {
                    self.toast.error("Status stream closed");
                }
                if self.missing_audio.should_alert(&event) {
                    self.toast.error("No audio URL found for the podcast");
                }
                let update = self.state.studio.apply_event(&event);
                if let Some(url) = update.load_audio {
                    self.load_studio_audio(url).await;
                }
                return update.changed || matches!(event, PollerEvent::Connection(_));
            }

            AppMessage::Player(event) => match event {
                PlayerEvent::Paused(p) => self.state.playback.paused = p,
                PlayerEvent::TimePos(t) => self.state.playback.time_pos_secs = t,
                PlayerEvent::Duration(d) => self.state.playback.duration_secs = d,
                PlayerEvent::Eof(e) => self.state.playback.eof = e,
                PlayerEvent::Exited => {
                    if self.player.take().is_some() {
                        error!("player: mpv exited");
                        self.toast.error("mpv exited, playback unavailable");
                    }
                    self.state.player_available = false;
                    self.state.playback = PlaybackInfo::default();
                    self.player_source = None;
                }
            },

            AppMessage::PlayerStarted(result) => match result {
                Ok(player) => {
                    info!("player: ready");
                    self.player = Some(player);
                    self.state.player_available = true;
                    // Audio may have arrived before mpv was up.
                    if let Some(url) = self.state.studio.audio_source().map(str::to_string) {
                        self.load_studio_audio(url).await;
                    }
                }
                Err(e) => {
                    warn!("player: {:#}", e);
                    self.toast
                        .push(format!("mpv unavailable: {}", e), Severity::Warning, Duration::from_secs(6));
                }
            },

            AppMessage::RecordingStarted(result, name) => self.on_recording_started(result, name),

            AppMessage::PodcastsLoaded(result) => match result {
                Ok(podcasts) => {
                    debug!("podcasts: {} loaded", podcasts.len());
                    // Keep the open podcast's title current.
                    if let Some(current) = self.state.current_podcast.as_mut() {
                        if let Some(fresh) = podcasts.iter().find(|p| p.id == current.id) {
                            *current = fresh.clone();
                        }
                    }
                    self.state.podcasts = podcasts;
                    self.state.podcasts_loaded = true;
                    self.podcast_list.sync(&self.state.podcasts);
                }
                Err(msg) => {
                    self.state.podcasts_loaded = true;
                    self.toast.error(msg);
                }
            },

            AppMessage::VoicesLoaded(result) => match result {
                Ok(info) => {
                    debug!(
                        "voices: {} stock, {} custom",
                        info.voices.len(),
                        info.custom_voices.len()
                    );
                    self.state.voices = info;
                    self.state.voices_loaded = true;
                    self.voice_list.sync(&self.state.voices);
                }
                Err(msg) => {
                    self.state.voices_loaded = true;
                    self.toast.error(msg);
                }
            },

            AppMessage::FormDone(form, result) => self.on_form_done(form, result),
        }
        true
    }

    fn on_form_done(&mut self, form: Form, result: Result<(), String>) {
        let ok = result.is_ok();
        let (severity, text) = match result {
            Ok(()) => {
                info!("{:?}: {}", form, form.success_text());
                (Severity::Success, form.success_text().to_string())
            }
            Err(msg) => (Severity::Error, msg),
        };

        if form == Form::UploadVoice {
            self.state.recorder = RecorderStatus::Idle;
            self.state.recorder_message = Some(text.clone());
        }
        if form.pending_text().is_some() {
            self.toast.resolve_spinner(severity, text);
        } else {
            match severity {
                Severity::Success => self.toast.success(text),
                _ => self.toast.error(text),
            }
        }

        if ok && form.refreshes_podcasts() {
            self.refresh_podcasts();
        }
        if ok && form.refreshes_voices() {
            self.refresh_voices();
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // An open prompt captures every key.
        if let Some(prompt) = self.prompt.as_mut() {
            return match prompt.handle_key(key) {
                PromptAction::Changed => vec![],
                PromptAction::Submitted(value) => {
                    vec![Action::PromptSubmitted(prompt.kind.clone(), value)]
                }
                PromptAction::Cancelled => vec![Action::ClosePrompt],
            };
        }

        let normal = self.state.input_mode == InputMode::Normal;
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE && normal => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if normal => return vec![Action::ToggleHelp],
            KeyCode::Char('l') | KeyCode::Char('L') if normal => return vec![Action::ToggleLogs],
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.wm.show_help {
            let actions = self.help_overlay.handle_key(key, &self.state);
            if !actions.is_empty() {
                return actions;
            }
            return vec![Action::ToggleHelp];
        }

        // Tab / Shift-Tab always cycle focus (in filter mode, it closes filter first)
        match key.code {
            KeyCode::Tab => {
                if self.state.input_mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusNext];
                }
                return vec![Action::FocusNext];
            }
            KeyCode::BackTab => {
                if self.state.input_mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusPrev];
                }
                return vec![Action::FocusPrev];
            }
            _ => {}
        }

        if normal {
            match key.code {
                KeyCode::Char('1') => return vec![Action::SwitchWorkspace(Workspace::Podcasts)],
                KeyCode::Char('2') => return vec![Action::SwitchWorkspace(Workspace::Studio)],
                KeyCode::Char('3') => return vec![Action::SwitchWorkspace(Workspace::Voices)],
                _ => {}
            }
        }

        // Dispatch to the focused component
        let s = &self.state;
        match self.wm.focused() {
            Some(ComponentId::PodcastList) => self.podcast_list.handle_key(key, s),
            Some(ComponentId::ScriptPane) => self.script_pane.handle_key(key, s),
            Some(ComponentId::AudioPlayer) => self.audio_player.handle_key(key, s),
            Some(ComponentId::VoiceList) => self.voice_list.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            Some(ComponentId::HelpOverlay) => self.help_overlay.handle_key(key, s),
            None => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click || self.prompt.is_some() || self.wm.show_help {
            return vec![];
        }

        let col = event.column;
        let row = event.row;

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas.clone();
        let s = &self.state;

        macro_rules! click_pane {
            ($id:expr, $component:expr, $area:expr) => {{
                let mut actions = $component.handle_mouse(event, $area, s);
                if self.wm.focused() != Some($id) {
                    actions.insert(0, Action::FocusPane($id));
                }
                return actions;
            }};
        }

        if hit(areas.podcast_list, col, row) {
            click_pane!(ComponentId::PodcastList, self.podcast_list, areas.podcast_list);
        }
        if hit(areas.script_pane, col, row) {
            click_pane!(ComponentId::ScriptPane, self.script_pane, areas.script_pane);
        }
        if hit(areas.audio_player, col, row) {
            click_pane!(ComponentId::AudioPlayer, self.audio_player, areas.audio_player);
        }
        if hit(areas.voice_list, col, row) {
            click_pane!(ComponentId::VoiceList, self.voice_list, areas.voice_list);
        }
        if hit(areas.log_panel, col, row) {
            click_pane!(ComponentId::LogPanel, self.log_panel, areas.log_panel);
        }

        vec![]
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast to all components first so they can react (scroll resets etc.)
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.podcast_list.on_action(&action, s));
            out.extend(self.script_pane.on_action(&action, s));
            out.extend(self.audio_player.on_action(&action, s));
            out.extend(self.voice_list.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Secondary actions are depth-limited to 1 level.
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Resize(_, _) => {}

            // ── Navigation ────────────────────────────────────────────────
            Action::FocusNext => {
                self.wm.focus.next();
                self.sync_input_mode();
            }
            Action::FocusPrev => {
                self.wm.focus.prev();
                self.sync_input_mode();
            }
            Action::FocusPane(id) => {
                self.wm.focus_set(id);
                self.sync_input_mode();
            }
            Action::SwitchWorkspace(ws) => {
                self.wm.switch(ws);
                self.state.workspace = ws;
                self.sync_input_mode();
                if ws == Workspace::Voices && !self.state.voices_loaded {
                    self.refresh_voices();
                }
            }
            Action::ToggleLogs => {
                self.wm.toggle_logs();
                if self.wm.show_log_panel {
                    self.reload_log();
                }
            }
            Action::ToggleHelp => self.wm.show_help = !self.wm.show_help,

            // ── Filter / prompt ───────────────────────────────────────────
            Action::OpenFilter => self.state.input_mode = InputMode::Filter,
            Action::CloseFilter => self.state.input_mode = InputMode::Normal,
            Action::OpenPrompt(kind) => {
                let needs_podcast = matches!(kind, PromptKind::Chapters | PromptKind::AssignSpeaker(_));
                if needs_podcast && self.state.current_podcast.is_none() {
                    self.toast.error("Open a podcast first");
                    return;
                }
                self.prompt = Some(match kind {
                    PromptKind::VoiceName => {
                        Prompt::with_value(kind, &self.config.recorder.default_voice_name)
                    }
                    other => Prompt::new(other),
                });
                self.state.input_mode = InputMode::Prompt;
            }
            Action::ClosePrompt => {
                self.prompt = None;
                self.state.input_mode = InputMode::Normal;
            }
            Action::PromptSubmitted(kind, value) => {
                self.prompt = None;
                self.state.input_mode = InputMode::Normal;
                self.on_prompt_submitted(kind, value);
            }

            // ── Podcasts ──────────────────────────────────────────────────
            Action::RefreshPodcasts => self.refresh_podcasts(),
            Action::OpenPodcast(podcast) => {
                info!("podcasts: opened {} ({})", podcast.title, podcast.id);
                self.toast.info(format!("Opened \"{}\"", podcast.title));
                self.state.current_podcast = Some(podcast);
                self.wm.switch(Workspace::Studio);
                self.state.workspace = Workspace::Studio;
            }

            // ── Studio ────────────────────────────────────────────────────
            Action::SaveTranscript => {
                let Some(id) = self.require_podcast() else { return };
                self.submit(Form::SaveTranscript, move |api| async move {
                    api.save_transcript(&id).await
                });
            }
            Action::GeneratePodcast => {
                let Some(id) = self.require_podcast() else { return };
                self.submit(Form::GeneratePodcast, move |api| async move {
                    api.generate_podcast(&id).await
                });
            }

            // ── Player ────────────────────────────────────────────────────
            Action::TogglePause => self.toggle_pause().await,
            Action::SeekRelative(secs) => {
                if let Some(player) = &self.player {
                    if let Err(e) = player.seek_relative(secs).await {
                        warn!("player: seek failed: {}", e);
                    }
                }
            }

            // ── Voices ────────────────────────────────────────────────────
            Action::RefreshVoices => self.refresh_voices(),
            Action::PreviewVoice(path) => self.preview_voice(&path).await,
            Action::ToggleRecording => {
                if self.recording.is_some() {
                    self.stop_recording();
                } else {
                    let name = self.config.recorder.default_voice_name.clone();
                    self.start_recording(name);
                }
            }
        }
    }

    fn on_prompt_submitted(&mut self, kind: PromptKind, value: String) {
        match kind {
            PromptKind::PodcastTitle => {
                if value.is_empty() {
                    self.toast.error("A title is required");
                    return;
                }
                self.submit(Form::CreatePodcast, move |api| async move {
                    api.create_podcast(&value).await.map(|_| ())
                });
            }
            PromptKind::Chapters => {
                let Some(id) = self.require_podcast() else { return };
                let request = ScriptRequest::from_chapter_list(id, &value);
                if request.chapters.is_empty() {
                    self.toast.error("Enter at least one chapter");
                    return;
                }
                self.submit(Form::GenerateScript, move |api| async move {
                    api.generate_script(&request).await
                });
            }
            PromptKind::VoiceName => {
                let name = if value.is_empty() {
                    self.config.recorder.default_voice_name.clone()
                } else {
                    value
                };
                self.start_recording(name);
            }
            PromptKind::AssignSpeaker(voice_name) => {
                let Some(id) = self.require_podcast() else { return };
                let Ok(speaker_id) = value.parse::<u32>() else {
                    self.toast.error("Speaker id must be a number");
                    return;
                };
                let assignment = VoiceAssignment {
                    podcast_uuid: id,
                    speaker_id,
                    voice_name,
                };
                self.submit(Form::AssignVoice, move |api| async move {
                    api.assign_voice(&assignment).await
                });
            }
            PromptKind::ConfirmDeletePodcast(uuid) => {
                if !is_confirmation(&value) {
                    return;
                }
                if self.state.current_podcast_id() == Some(uuid.as_str()) {
                    self.state.current_podcast = None;
                    self.state.studio.clear();
                }
                self.submit(Form::DeletePodcast, move |api| async move {
                    api.delete_podcast(&uuid).await
                });
            }
            PromptKind::ConfirmDeleteVoice(filepath) => {
                if !is_confirmation(&value) {
                    return;
                }
                self.submit(Form::DeleteVoice, move |api| async move {
                    api.delete_voice(&filepath).await
                });
            }
        }
    }

    // ── Backend calls ─────────────────────────────────────────────────────────

    /// Uuid of the open podcast, or an error toast.
    fn require_podcast(&mut self) -> Option<String> {
        let id = self.state.current_podcast_id().map(str::to_string);
        if id.is_none() {
            self.toast.error("Open a podcast first");
        }
        id
    }

    /// Run one backend call in the background; the outcome comes back as
    /// `AppMessage::FormDone`.
    fn submit<F, Fut>(&mut self, form: Form, call: F)
    where
        F: FnOnce(PodcraftApi) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        if let Some(text) = form.pending_text() {
            self.toast.spinner(text);
        }
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = call(api).await.map_err(|e| {
                warn!("{:?} failed: {}", form, e);
                e.user_message(form.error_text())
            });
            let _ = tx.send(AppMessage::FormDone(form, result)).await;
        });
    }

    fn refresh_podcasts(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.list_podcasts().await.map_err(|e| {
                warn!("podcasts: list failed: {}", e);
                e.user_message("Error loading podcasts.")
            });
            let _ = tx.send(AppMessage::PodcastsLoaded(result)).await;
        });
    }

    fn refresh_voices(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.voice_info().await.map_err(|e| {
                warn!("voices: info failed: {}", e);
                e.user_message("Error loading voices.")
            });
            let _ = tx.send(AppMessage::VoicesLoaded(result)).await;
        });
    }

    // ── Player ────────────────────────────────────────────────────────────────

    /// Bind mpv to the studio's podcast audio, paused.
    async fn load_studio_audio(&mut self, url: String) {
        let Some(player) = &self.player else {
            debug!("player: not ready, deferring {}", url);
            return;
        };
        info!("player: loading {}", url);
        match player.load(&url).await {
            Ok(()) => {
                self.state.playback = PlaybackInfo {
                    paused: true,
                    ..PlaybackInfo::default()
                };
                self.player_source = Some(url);
            }
            Err(e) => {
                warn!("player: load failed: {}", e);
                self.toast.error("Could not load podcast audio");
            }
        }
    }

    async fn toggle_pause(&mut self) {
        let Some(player) = &self.player else {
            self.toast.error("mpv is not available");
            return;
        };
        let studio_source = self.state.studio.audio_source().map(str::to_string);
        // After a voice preview mpv holds another file; switch back first.
        let result = match studio_source {
            Some(url) if self.player_source.as_deref() != Some(url.as_str()) => {
                let r = player.play(&url).await;
                if r.is_ok() {
                    self.player_source = Some(url);
                    self.state.playback = PlaybackInfo::default();
                }
                r
            }
            _ => player.toggle_pause().await,
        };
        if let Err(e) = result {
            warn!("player: {}", e);
        }
    }

    async fn preview_voice(&mut self, path: &str) {
        let Some(player) = &self.player else {
            self.toast.error("mpv is not available");
            return;
        };
        let url = match self.api.resolve(path) {
            Ok(u) => u.to_string(),
            Err(e) => {
                warn!("voices: bad preview path {:?}: {}", path, e);
                self.toast.error("Cannot play this voice");
                return;
            }
        };
        info!("player: previewing {}", url);
        match player.play(&url).await {
            Ok(()) => {
                self.player_source = Some(url);
                self.state.playback = PlaybackInfo::default();
            }
            Err(e) => {
                warn!("player: preview failed: {}", e);
                self.toast.error("Cannot play this voice");
            }
        }
    }

    // ── Recorder ──────────────────────────────────────────────────────────────

    /// Open the microphone off the event loop; `RecordingStarted` reports back.
    fn start_recording(&mut self, name: String) {
        if self.recording.is_some() || self.state.recorder != RecorderStatus::Idle {
            return;
        }
        self.state.recorder = RecorderStatus::Starting;
        self.state.recorder_message = None;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = Recording::open().await;
            let _ = tx.send(AppMessage::RecordingStarted(result, name)).await;
        });
    }

    fn on_recording_started(&mut self, result: Result<Recording, RecorderError>, name: String) {
        match result {
            Ok(recording) => {
                info!("recorder: capturing voice {:?}", name);
                self.recording = Some((recording, name));
                self.state.recorder = RecorderStatus::Recording;
                self.state.recorder_message = None;
            }
            Err(e) => {
                warn!("recorder: {}", e);
                let msg = e.to_string();
                self.state.recorder = RecorderStatus::Idle;
                self.state.recorder_message = Some(msg.clone());
                self.toast.error(msg);
            }
        }
    }

    /// Stop the capture, then encode and upload off the event loop.
    fn stop_recording(&mut self) {
        let Some((recording, name)) = self.recording.take() else {
            return;
        };
        self.state.recorder = RecorderStatus::Processing;
        if let Some(text) = Form::UploadVoice.pending_text() {
            self.toast.spinner(text);
        }

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let encoded = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
                let captured = recording.finish()?;
                recorder::encode_wav(&captured)
            })
            .await;
            let result = match encoded {
                Ok(Ok(wav)) => {
                    debug!("recorder: uploading {} bytes as {:?}", wav.len(), name);
                    api.upload_voice(&name, wav)
                        .await
                        .map_err(|e| e.user_message(Form::UploadVoice.error_text()))
                }
                Ok(Err(e)) => {
                    warn!("recorder: {:#}", e);
                    Err(Form::UploadVoice.error_text().to_string())
                }
                Err(e) => {
                    error!("recorder: encode task failed: {}", e);
                    Err(Form::UploadVoice.error_text().to_string())
                }
            };
            let _ = tx.send(AppMessage::FormDone(Form::UploadVoice, result)).await;
        });
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::{Block, Borders};
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        // ── Outer layout: header | body | (log) | keys ───────────────────────
        let log_h = if self.wm.show_log_panel { LOG_PANEL_HEIGHT } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(log_h),
                Constraint::Length(1),
            ])
            .split(area);
        let (header_area, body_area, log_area, status_area) = (outer[0], outer[1], outer[2], outer[3]);

        status_bar::draw_tabs(
            frame,
            header_area,
            self.wm.workspace,
            &self.state.backend_url,
            self.state.studio.connection(),
        );
        status_bar::draw_keys_bar(frame, status_area, self.state.input_mode, self.wm.workspace);

        // ── Log panel ─────────────────────────────────────────────────────────
        if self.wm.show_log_panel {
            let focused = self.wm.is_focused(ComponentId::LogPanel);
            self.log_panel.borders = Borders::LEFT | Borders::BOTTOM | Borders::RIGHT;
            self.log_panel.draw(frame, log_area, focused, &self.state);
            self.pane_areas.log_panel = log_area;
        } else {
            self.pane_areas.log_panel = Rect::default();
        }

        // ── Body layout depends on workspace ─────────────────────────────────
        self.pane_areas.podcast_list = Rect::default();
        self.pane_areas.script_pane = Rect::default();
        self.pane_areas.audio_player = Rect::default();
        self.pane_areas.voice_list = Rect::default();
        match self.wm.workspace {
            Workspace::Podcasts => {
                let focused = self.wm.is_focused(ComponentId::PodcastList);
                self.podcast_list.draw(frame, body_area, focused, &self.state);
                self.pane_areas.podcast_list = body_area;
            }
            Workspace::Studio => {
                let split = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(TRANSPORT_HEIGHT)])
                    .split(body_area);
                let focused = self.wm.is_focused(ComponentId::ScriptPane);
                self.script_pane.draw(frame, split[0], focused, &self.state);
                let focused = self.wm.is_focused(ComponentId::AudioPlayer);
                self.audio_player.draw(frame, split[1], focused, &self.state);
                self.pane_areas.script_pane = split[0];
                self.pane_areas.audio_player = split[1];
            }
            Workspace::Voices => {
                let focused = self.wm.is_focused(ComponentId::VoiceList);
                self.voice_list.draw(frame, body_area, focused, &self.state);
                self.pane_areas.voice_list = body_area;
            }
        }

        if let Some(prompt) = &self.prompt {
            prompt.draw(frame, body_area);
        }

        if self.wm.show_help {
            self.help_overlay.draw(frame, area, false, &self.state);
        }

        // Toasts are the topmost layer.
        self.toast.draw(frame, area);
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Read the last lines of podcraft.log into state.log_lines.
    fn reload_log(&mut self) {
        match std::fs::read_to_string(&self.log_path) {
            Ok(content) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = lines.len().saturating_sub(LOG_TAIL_LINES);
                self.state.log_lines = lines[start..].iter().map(|l| l.to_string()).collect();
            }
            Err(e) => debug!("log: cannot read {}: {}", self.log_path.display(), e),
        }
    }

    /// Filter mode only survives while the podcast list keeps focus.
    fn sync_input_mode(&mut self) {
        if self.state.input_mode == InputMode::Filter
            && !(self.wm.is_focused(ComponentId::PodcastList) && self.podcast_list.is_filtering())
        {
            self.state.input_mode = InputMode::Normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FORMS: [Form; 8] = [
        Form::CreatePodcast,
        Form::DeletePodcast,
        Form::GenerateScript,
        Form::SaveTranscript,
        Form::GeneratePodcast,
        Form::UploadVoice,
        Form::DeleteVoice,
        Form::AssignVoice,
    ];

    #[test]
    fn test_form_texts() {
        assert_eq!(Form::SaveTranscript.success_text(), "Transcript updated successfully!");
        assert_eq!(Form::SaveTranscript.error_text(), "Error updating transcript.");
        assert_eq!(Form::GenerateScript.error_text(), "Error generating podcast script!!");
        assert_eq!(Form::GeneratePodcast.error_text(), "Error generating podcast.");
        assert_eq!(Form::UploadVoice.success_text(), "Recording saved!");
        for form in ALL_FORMS {
            assert!(!form.success_text().is_empty());
            assert_ne!(form.success_text(), form.error_text());
        }
    }

    #[test]
    fn test_form_refreshes() {
        assert!(Form::CreatePodcast.refreshes_podcasts());
        assert!(Form::DeletePodcast.refreshes_podcasts());
        assert!(Form::UploadVoice.refreshes_voices());
        assert!(Form::DeleteVoice.refreshes_voices());
        assert!(!Form::SaveTranscript.refreshes_podcasts());
        assert!(!Form::AssignVoice.refreshes_voices());
    }

    #[test]
    fn test_long_running_forms_show_spinner() {
        assert!(Form::GenerateScript.pending_text().is_some());
        assert!(Form::GeneratePodcast.pending_text().is_some());
        assert_eq!(Form::UploadVoice.pending_text(), Some("Processing recording..."));
        assert!(Form::DeleteVoice.pending_text().is_none());
    }

    #[test]
    fn test_missing_audio_alerts_once_per_run() {
        use podcraft_client::status::plan;
        use podcraft_client::GenerationStatus;

        let status = |gp: bool, pa: bool| {
            let s = GenerationStatus {
                is_generating_podcast: gp,
                is_podcast_available: pa,
                ..Default::default()
            };
            PollerEvent::Status {
                status: s,
                effects: plan(&s),
            }
        };
        let mut notice = MissingAudioNotice::default();
        assert!(notice.should_alert(&PollerEvent::AudioMissing));
        for _ in 0..3 {
            assert!(!notice.should_alert(&status(false, true)));
            assert!(!notice.should_alert(&PollerEvent::AudioMissing));
        }

        notice.should_alert(&status(true, false));
        assert!(notice.should_alert(&PollerEvent::AudioMissing));

        notice.should_alert(&PollerEvent::AudioReady("http://x/a.wav".into()));
        assert!(notice.should_alert(&PollerEvent::AudioMissing));
    }
}
