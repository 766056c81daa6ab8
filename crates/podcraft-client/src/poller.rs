//! Generation-status poller.
//!
//! Subscribes to the backend's status event stream, turns every snapshot
//! into a `Status` event plus the follow-up fetches its rules ask for, and
//! reports everything to the consumer over an mpsc channel.  The poller owns
//! no view; `StudioView::apply_event` is the usual consumer.
//!
//! ```text
//!  Connecting ──open──▶ Open ──error──▶ backoff? ──yes──▶ Connecting
//!       │                 │                 │
//!       └──── close ──────┴─────────────────┴──no──▶ Closed
//! ```

use futures_util::StreamExt;
use reqwest_eventsource::{retry, Event, EventSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, PodcraftApi};
use crate::config::StreamConfig;
use crate::protocol::{GenerationStatus, ScriptLine};
use crate::single_flight::{Completion, SingleFlight, Ticket};
use crate::status::{plan, Effect, FollowUpKind};

/// SSE event name of status snapshots; frames with any other name
/// (heartbeats, pings) are skipped.
const STATUS_EVENT: &str = "message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    Connection(SubscriptionState),
    /// A decoded snapshot (after conflict resolution) and the effects its
    /// rules produced, in rule order.
    Status {
        status: GenerationStatus,
        effects: Vec<Effect>,
    },
    ScriptLoaded(Vec<ScriptLine>),
    /// Absolute URL of the finished podcast audio.
    AudioReady(String),
    /// The backend reported the podcast available but sent no URL.
    AudioMissing,
    FollowUpFailed {
        kind: FollowUpKind,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("status stream: {0}")]
    Stream(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Handle to a running poller.  Dropping it closes the subscription.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Close the subscription.  Pending follow-up results are discarded.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the poller task to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("poller: task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Open the status subscription in a background task.
    pub fn spawn(
        api: PodcraftApi,
        config: StreamConfig,
        tx: mpsc::Sender<PollerEvent>,
    ) -> PollerHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(api, config, tx, cancel.clone()));
        PollerHandle {
            cancel,
            task: Some(task),
        }
    }
}

enum FollowUp {
    Script(Vec<ScriptLine>),
    Audio(Option<String>),
}

type Fetched = (Ticket, Result<FollowUp, ApiError>);

/// How one connection ended.
enum SessionEnd {
    /// Closed by the handle or the consumer went away.
    Stopped,
    Failed { opened: bool, error: PollerError },
}

struct Poller {
    api: PodcraftApi,
    config: StreamConfig,
    tx: mpsc::Sender<PollerEvent>,
    cancel: CancellationToken,
    flights: SingleFlight,
    done_tx: mpsc::Sender<Fetched>,
}

async fn run(
    api: PodcraftApi,
    config: StreamConfig,
    tx: mpsc::Sender<PollerEvent>,
    cancel: CancellationToken,
) {
    let (done_tx, mut done_rx) = mpsc::channel::<Fetched>(8);
    let mut poller = Poller {
        api,
        config,
        tx,
        cancel,
        flights: SingleFlight::new(),
        done_tx,
    };

    let mut attempt: u32 = 0;
    loop {
        if !poller.emit(PollerEvent::Connection(SubscriptionState::Connecting)).await {
            break;
        }
        match poller.session(&mut done_rx).await {
            SessionEnd::Stopped => break,
            SessionEnd::Failed { opened, error } => {
                warn!("poller: {}", error);
                if opened {
                    attempt = 0;
                }
                attempt = attempt.saturating_add(1);
                let Some(delay) = poller.config.backoff(attempt) else {
                    info!("poller: not reconnecting, subscription closed");
                    break;
                };
                info!("poller: reconnecting in {:?} (attempt {})", delay, attempt);
                tokio::select! {
                    _ = poller.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    // Best effort: the consumer may already be gone.
    let _ = poller
        .tx
        .try_send(PollerEvent::Connection(SubscriptionState::Closed));
    debug!("poller: exited");
}

impl Poller {
    /// Send to the consumer.  False once it has hung up or the handle closed.
    async fn emit(&self, event: PollerEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    async fn session(&mut self, done_rx: &mut mpsc::Receiver<Fetched>) -> SessionEnd {
        let request = match self.api.status_stream_request() {
            Ok(r) => r,
            Err(e) => {
                return SessionEnd::Failed {
                    opened: false,
                    error: e.into(),
                }
            }
        };
        let mut es = match EventSource::new(request) {
            Ok(es) => es,
            Err(e) => {
                return SessionEnd::Failed {
                    opened: false,
                    error: PollerError::Stream(e.to_string()),
                }
            }
        };
        // Reconnects are ours to make, from StreamConfig.
        es.set_retry_policy(Box::new(retry::Never));

        let mut opened = false;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    es.close();
                    return SessionEnd::Stopped;
                }
                Some((ticket, result)) = done_rx.recv() => {
                    if !self.complete(ticket, result).await {
                        es.close();
                        return SessionEnd::Stopped;
                    }
                }
                event = es.next() => match event {
                    Some(Ok(Event::Open)) => {
                        opened = true;
                        info!("poller: status stream open");
                        if !self.emit(PollerEvent::Connection(SubscriptionState::Open)).await {
                            es.close();
                            return SessionEnd::Stopped;
                        }
                    }
                    Some(Ok(Event::Message(msg))) if msg.event != STATUS_EVENT => {
                        debug!("poller: ignoring {:?} event", msg.event);
                    }
                    Some(Ok(Event::Message(msg))) => {
                        if !self.on_message(&msg.data).await {
                            es.close();
                            return SessionEnd::Stopped;
                        }
                    }
                    Some(Err(e)) => {
                        es.close();
                        return SessionEnd::Failed {
                            opened,
                            error: PollerError::Stream(e.to_string()),
                        };
                    }
                    None => {
                        return SessionEnd::Failed {
                            opened,
                            error: PollerError::Stream("stream ended".to_string()),
                        };
                    }
                }
            }
        }
    }

    async fn on_message(&mut self, data: &str) -> bool {
        let status: GenerationStatus = match serde_json::from_str(data) {
            Ok(s) => s,
            Err(e) => {
                warn!("poller: dropping undecodable status message {:?}: {}", data, e);
                return true;
            }
        };
        let Some(status) = self.config.conflict_policy.resolve(status) else {
            return true;
        };

        let effects = plan(&status);
        for kind in FollowUpKind::ALL {
            self.flights.observe(kind, kind.is_available(&status));
        }
        let fetches: Vec<FollowUpKind> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Fetch(kind) => Some(*kind),
                _ => None,
            })
            .collect();

        if !self.emit(PollerEvent::Status { status, effects }).await {
            return false;
        }
        for kind in fetches {
            self.begin(kind);
        }
        true
    }

    fn begin(&mut self, kind: FollowUpKind) {
        let Some(ticket) = self.flights.try_begin(kind) else {
            debug!("poller: {} fetch already in flight, coalescing", kind.label());
            return;
        };
        let api = self.api.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = match ticket.kind {
                FollowUpKind::Script => api.podcast_script().await.map(FollowUp::Script),
                FollowUpKind::AudioUrl => api
                    .podcast_audio_url()
                    .await
                    .map(|u| FollowUp::Audio(u.audio_url)),
            };
            // Poller gone: result is discarded.
            let _ = done.send((ticket, result)).await;
        });
    }

    async fn complete(&mut self, ticket: Ticket, result: Result<FollowUp, ApiError>) -> bool {
        let kind = ticket.kind;
        match self.flights.finish(ticket) {
            Completion::Stale { reissue } => {
                debug!("poller: discarding stale {} result (reissue={})", kind.label(), reissue);
                if reissue {
                    self.begin(kind);
                }
                true
            }
            Completion::Apply => {
                let event = match result {
                    Ok(FollowUp::Script(lines)) => PollerEvent::ScriptLoaded(lines),
                    Ok(FollowUp::Audio(Some(url))) => match self.api.resolve(&url) {
                        Ok(resolved) => PollerEvent::AudioReady(resolved.to_string()),
                        Err(e) => PollerEvent::FollowUpFailed {
                            kind,
                            message: e.to_string(),
                        },
                    },
                    Ok(FollowUp::Audio(None)) => {
                        error!("poller: no audio URL found in response");
                        PollerEvent::AudioMissing
                    }
                    Err(e) => {
                        warn!("poller: {} fetch failed: {}", kind.label(), e);
                        PollerEvent::FollowUpFailed {
                            kind,
                            message: e.to_string(),
                        }
                    }
                };
                self.emit(event).await
            }
        }
    }
}
