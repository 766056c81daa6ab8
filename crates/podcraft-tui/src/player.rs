/// mpv IPC driver for podcast playback.
///
/// ```text
///   Player::start()
///         │
///         ├── writer_task   ← PendingRequest via mpsc, serialised → socket
///         └── reader_task   ← JSON lines from socket
///                                ├── response (request_id) → matched oneshot
///                                └── property-change       → PlayerEvent channel
/// ```
///
/// Platform notes:
/// - Unix:    Unix domain socket
/// - Windows: named pipe \\.\pipe\<name>
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use podcraft_client::config::PlayerConfig;
use podcraft_client::platform;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

pub const OBS_PAUSE: u64 = 1;
pub const OBS_TIME_POS: u64 = 2;
pub const OBS_DURATION: u64 = 3;
pub const OBS_EOF: u64 = 4;

const OBSERVED: [(u64, &str); 4] = [
    (OBS_PAUSE, "pause"),
    (OBS_TIME_POS, "time-pos"),
    (OBS_DURATION, "duration"),
    (OBS_EOF, "eof-reached"),
];

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Player state changes pushed by mpv.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Paused(bool),
    /// `None` while nothing is loaded.
    TimePos(Option<f64>),
    Duration(Option<f64>),
    Eof(bool),
    /// The IPC connection closed; mpv is gone.
    Exited,
}

impl PlayerEvent {
    /// Parse one unsolicited mpv message.  Only property changes for the
    /// observed ids produce an event.
    pub fn parse(raw: &Value) -> Option<Self> {
        if raw.get("event")?.as_str()? != "property-change" {
            return None;
        }
        let id = raw.get("id")?.as_u64()?;
        let data = raw.get("data").unwrap_or(&Value::Null);
        match id {
            OBS_PAUSE => Some(Self::Paused(data.as_bool().unwrap_or(false))),
            OBS_TIME_POS => Some(Self::TimePos(data.as_f64())),
            OBS_DURATION => Some(Self::Duration(data.as_f64())),
            OBS_EOF => Some(Self::Eof(data.as_bool().unwrap_or(false))),
            _ => None,
        }
    }
}

/// Owns the mpv child process and a command handle to it.
pub struct Player {
    tx: mpsc::Sender<PendingRequest>,
    process: Option<tokio::process::Child>,
    volume: f32,
}

impl Player {
    /// Spawn an idle mpv, connect to its IPC endpoint and observe the
    /// playback properties.  Events flow into `event_tx`.
    pub async fn start(
        config: &PlayerConfig,
        event_tx: mpsc::Sender<PlayerEvent>,
    ) -> anyhow::Result<Self> {
        let mpv_binary = platform::find_mpv_binary(config.mpv_path.as_deref())
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let socket_name = platform::mpv_socket_name();

        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&socket_name).await;

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        info!("player: spawning {}", mpv_binary.display());
        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--keep-open=yes")
            .arg(platform::mpv_socket_arg())
            .arg("--quiet")
            .arg(format!("--volume={}", volume_pct(config.volume)))
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("player: mpv pid {:?}", child.id());

        let tx = connect(&socket_name, event_tx).await?;
        let player = Self {
            tx,
            process: Some(child),
            volume: config.volume,
        };
        player.observe_properties().await;
        Ok(player)
    }

    async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut raw = serde_json::to_string(&json!({ "command": command, "request_id": req_id }))?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    async fn observe_properties(&self) {
        for (id, name) in OBSERVED {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("player: observe_property id={} name={}", id, name),
                Err(e) => warn!("player: observe_property {} failed: {}", name, e),
            }
        }
    }

    /// Replace the current source.  Playback starts paused at 0:00.
    pub async fn load(&self, url: &str) -> anyhow::Result<()> {
        self.loadfile(url, true).await
    }

    /// Replace the current source and start playing.
    pub async fn play(&self, url: &str) -> anyhow::Result<()> {
        self.loadfile(url, false).await
    }

    async fn loadfile(&self, url: &str, paused: bool) -> anyhow::Result<()> {
        debug!("player: loadfile {} paused={}", url, paused);
        // pause is a global property in mpv and survives the file change
        self.send(json!(["set_property", "pause", paused])).await?;
        self.send(json!(["loadfile", url, "replace"])).await?;
        self.set_volume(self.volume).await
    }

    pub async fn toggle_pause(&self) -> anyhow::Result<()> {
        self.send(json!(["cycle", "pause"])).await?;
        Ok(())
    }

    pub async fn seek_relative(&self, secs: f64) -> anyhow::Result<()> {
        self.send(json!(["seek", secs, "relative"])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, vol: f32) -> anyhow::Result<()> {
        self.send(json!(["set_property", "volume", volume_pct(vol)]))
            .await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.send(json!(["quit"])).await;
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }
}

fn volume_pct(vol: f32) -> i64 {
    (vol * 100.0).clamp(0.0, 100.0).round() as i64
}

#[cfg(unix)]
async fn connect(
    socket_name: &str,
    event_tx: mpsc::Sender<PlayerEvent>,
) -> anyhow::Result<mpsc::Sender<PendingRequest>> {
    let socket_path = std::path::PathBuf::from(socket_name);
    for _ in 0..50 {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        if socket_path.exists() {
            break;
        }
    }
    if !socket_path.exists() {
        anyhow::bail!("mpv IPC socket did not appear");
    }
    let stream = UnixStream::connect(&socket_path).await?;
    info!("player: connected to IPC socket");
    let (read_half, write_half) = stream.into_split();
    Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx))
}

#[cfg(windows)]
async fn connect(
    socket_name: &str,
    event_tx: mpsc::Sender<PlayerEvent>,
) -> anyhow::Result<mpsc::Sender<PendingRequest>> {
    let pipe_path = format!(r"\\.\pipe\{}", socket_name);
    for _ in 0..50 {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        if let Ok(client) = ClientOptions::new().open(&pipe_path) {
            info!("player: connected to named pipe");
            let (read_half, write_half) = tokio::io::split(client);
            return Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx));
        }
    }
    anyhow::bail!("mpv named pipe did not appear")
}

fn start_io_tasks<R, W>(
    reader: BufReader<R>,
    writer: W,
    event_tx: mpsc::Sender<PlayerEvent>,
) -> mpsc::Sender<PendingRequest>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);
    tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, event_tx));
    cmd_tx
}

async fn fail_all(pending: &Pending, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: Pending,
    event_tx: mpsc::Sender<PlayerEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("player reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("player reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            debug!("player reader: req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else if let Some(event) = PlayerEvent::parse(&val) {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("player reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
    let _ = event_tx.send(PlayerEvent::Exited).await;
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: Pending)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("player writer: req={} {}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("player writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("player writer: task exiting");
}
