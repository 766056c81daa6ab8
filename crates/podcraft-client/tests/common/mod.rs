//! In-process mock of the podcraft backend, served by axum on an ephemeral
//! port.  The status stream is fed by the test through `push_*`.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use podcraft_client::config::{ServerConfig, StreamConfig};
use podcraft_client::{PodcraftApi, PollerEvent};
use serde_json::{json, Value};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
pub struct Mock {
    stream: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pub connections: AtomicUsize,
    pub script_hits: AtomicUsize,
    pub audio_hits: AtomicUsize,
    script: Mutex<Option<Value>>,
    script_delay: Mutex<Duration>,
    audio: Mutex<Option<Value>>,
    /// Status and body returned by every form endpoint.
    form_reply: Mutex<Option<(StatusCode, String)>>,
    pub requests: Mutex<Vec<Recorded>>,
}

pub struct MockBackend {
    pub base_url: String,
    pub mock: Arc<Mock>,
}

/// Route client logs to the test harness; `RUST_LOG` raises the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,podcraft_client=debug")),
        )
        .with_test_writer()
        .try_init();
}

impl MockBackend {
    pub async fn start() -> Self {
        init_tracing();
        let mock = Arc::new(Mock::default());
        *mock.script.lock().unwrap() = Some(json!([]));
        *mock.audio.lock().unwrap() = Some(json!({ "audio_url": null }));

        let app = Router::new()
            .route("/api/check_flags", get(status_stream))
            .route("/api/get_podcast_script", get(script))
            .route("/api/get_podcast_audio_url", get(audio_url))
            .route("/api/voices/get-info", get(voice_info))
            .route("/api/podcasts", any(podcasts))
            .fallback(form)
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{}", addr),
            mock,
        }
    }

    pub fn api(&self) -> PodcraftApi {
        PodcraftApi::new(&ServerConfig {
            base_url: self.base_url.clone(),
            request_timeout_secs: Some(5),
        })
        .unwrap()
    }

    pub fn set_script(&self, lines: Value) {
        *self.mock.script.lock().unwrap() = Some(lines);
    }

    /// Make the script endpoint answer 500.
    pub fn fail_script(&self) {
        *self.mock.script.lock().unwrap() = None;
    }

    pub fn set_script_delay(&self, delay: Duration) {
        *self.mock.script_delay.lock().unwrap() = delay;
    }

    pub fn set_audio(&self, body: Value) {
        *self.mock.audio.lock().unwrap() = Some(body);
    }

    pub fn set_form_reply(&self, status: StatusCode, body: &str) {
        *self.mock.form_reply.lock().unwrap() = Some((status, body.to_string()));
    }

    /// Send a raw SSE frame on the open status stream.
    pub fn push_raw(&self, frame: &str) {
        let guard = self.mock.stream.lock().unwrap();
        let tx = guard.as_ref().expect("no status stream open");
        tx.send(frame.to_string()).unwrap();
    }

    pub fn push_data(&self, data: &str) {
        self.push_raw(&format!("data: {}\n\n", data));
    }

    pub fn push_status(&self, gs: bool, sa: bool, gp: bool, pa: bool) {
        self.push_data(
            &json!({
                "is_generating_script": gs,
                "is_script_available": sa,
                "is_generating_podcast": gp,
                "is_podcast_available": pa,
            })
            .to_string(),
        );
    }

    /// End the open status stream from the server side.
    pub fn drop_stream(&self) {
        self.mock.stream.lock().unwrap().take();
    }

    pub fn connections(&self) -> usize {
        self.mock.connections.load(Ordering::SeqCst)
    }

    pub fn script_hits(&self) -> usize {
        self.mock.script_hits.load(Ordering::SeqCst)
    }

    pub fn audio_hits(&self) -> usize {
        self.mock.audio_hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.mock.requests.lock().unwrap().clone()
    }
}

async fn status_stream(State(mock): State<Arc<Mock>>) -> Response {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    *mock.stream.lock().unwrap() = Some(tx);
    mock.connections.fetch_add(1, Ordering::SeqCst);

    let frames = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (Ok::<_, Infallible>(frame), rx))
    });
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .unwrap()
}

async fn script(State(mock): State<Arc<Mock>>) -> Response {
    mock.script_hits.fetch_add(1, Ordering::SeqCst);
    let delay = *mock.script_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let body = mock.script.lock().unwrap().clone();
    match body {
        Some(lines) => axum::Json(lines).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn audio_url(State(mock): State<Arc<Mock>>) -> Response {
    mock.audio_hits.fetch_add(1, Ordering::SeqCst);
    let body = mock.audio.lock().unwrap().clone().unwrap_or(Value::Null);
    axum::Json(body).into_response()
}

async fn voice_info() -> Response {
    axum::Json(json!({
        "voices": [{ "filename": "alice.wav", "filepath": "voices/alice.wav" }],
        "custom_voices": [],
    }))
    .into_response()
}

async fn podcasts(
    State(mock): State<Arc<Mock>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&mock, &method, &uri, &headers, &body);
    match method {
        Method::GET => axum::Json(json!([
            { "id": "p-1", "title": "First", "description": null },
            { "id": "p-2", "title": "Second" },
        ]))
        .into_response(),
        Method::POST => {
            let title = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v["title"].as_str().map(str::to_string))
                .unwrap_or_default();
            axum::Json(json!({ "id": "p-new", "title": title })).into_response()
        }
        _ => reply(&mock),
    }
}

async fn form(
    State(mock): State<Arc<Mock>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&mock, &method, &uri, &headers, &body);
    reply(&mock)
}

fn record(mock: &Mock, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        content_type,
        body: body.to_vec(),
    });
}

fn reply(mock: &Mock) -> Response {
    match mock.form_reply.lock().unwrap().clone() {
        Some((status, body)) => (status, body).into_response(),
        None => axum::Json(json!({ "status": "ok" })).into_response(),
    }
}

pub fn stream_config() -> StreamConfig {
    StreamConfig::default()
}

/// Next event from the poller, failing the test after five seconds.
pub async fn next_event(rx: &mut mpsc::Receiver<PollerEvent>) -> PollerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for poller event")
        .expect("poller channel closed")
}

/// Skip events until one matches `pred`.
pub async fn wait_for<F>(rx: &mut mpsc::Receiver<PollerEvent>, pred: F) -> PollerEvent
where
    F: Fn(&PollerEvent) -> bool,
{
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Assert nothing arrives for `ms` milliseconds.
pub async fn expect_quiet(rx: &mut mpsc::Receiver<PollerEvent>, ms: u64) {
    if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(ms), rx.recv()).await {
        panic!("unexpected poller event: {:?}", event);
    }
}
