//! Podcraft backend API client

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ServerConfig;
use crate::protocol::{
    AudioUrl, DeletePodcast, DeleteVoice, ErrorDetail, NewPodcast, Podcast, ScriptLine,
    ScriptRequest, VoiceAssignment, VoiceInfo,
};

pub const STATUS_STREAM_PATH: &str = "api/check_flags";
pub const SCRIPT_PATH: &str = "api/get_podcast_script";
pub const AUDIO_URL_PATH: &str = "api/get_podcast_audio_url";
pub const PODCASTS_PATH: &str = "api/podcasts";
pub const GENERATE_SCRIPT_PATH: &str = "api/generate_podcast_script";
pub const SAVE_TRANSCRIPT_PATH: &str = "api/podcasts/save-transcript";
pub const GENERATE_PODCAST_PATH: &str = "api/generate_podcast";
pub const VOICE_INFO_PATH: &str = "api/voices/get-info";
pub const VOICE_UPLOAD_PATH: &str = "api/voices/upload";
pub const VOICE_DELETE_PATH: &str = "api/voices/delete";
pub const VOICE_ASSIGN_PATH: &str = "api/voices/assign";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Text for a user-facing alert: the backend's `detail` when it sent one,
    /// `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                detail: Some(d), ..
            } if !d.is_empty() => d.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Typed client for every backend endpoint.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct PodcraftApi {
    client: reqwest::Client,
    base: Url,
    timeout: Option<Duration>,
}

impl PodcraftApi {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("podcraft/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: reqwest::Client, config: &ServerConfig) -> Result<Self, ApiError> {
        // Paths are joined relative to the base, so it must end in '/'.
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base,
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a path the backend reported (relative, absolute path or full
    /// URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.resolve(path)?;
        debug!("api: {} {}", method, url);
        let builder = self.client.request(method, url);
        // Applied per request so the long-lived status stream is never cut off.
        Ok(match self.timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
    }

    /// Open request for the status event stream.
    pub fn status_stream_request(&self) -> Result<RequestBuilder, ApiError> {
        let url = self.resolve(STATUS_STREAM_PATH)?;
        Ok(self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream"))
    }

    // ── reads ────────────────────────────────────────────────────────────────

    pub async fn podcast_script(&self) -> Result<Vec<ScriptLine>, ApiError> {
        let resp = self.request(reqwest::Method::GET, SCRIPT_PATH)?.send().await?;
        read_json(resp).await
    }

    pub async fn podcast_audio_url(&self) -> Result<AudioUrl, ApiError> {
        let resp = self.request(reqwest::Method::GET, AUDIO_URL_PATH)?.send().await?;
        read_json(resp).await
    }

    pub async fn list_podcasts(&self) -> Result<Vec<Podcast>, ApiError> {
        let resp = self.request(reqwest::Method::GET, PODCASTS_PATH)?.send().await?;
        read_json(resp).await
    }

    pub async fn voice_info(&self) -> Result<VoiceInfo, ApiError> {
        let resp = self.request(reqwest::Method::GET, VOICE_INFO_PATH)?.send().await?;
        read_json(resp).await
    }

    // ── podcast forms ────────────────────────────────────────────────────────

    pub async fn create_podcast(&self, title: &str) -> Result<Podcast, ApiError> {
        let body = NewPodcast {
            title: title.to_string(),
        };
        let resp = self
            .request(reqwest::Method::POST, PODCASTS_PATH)?
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn delete_podcast(&self, uuid: &str) -> Result<(), ApiError> {
        let body = DeletePodcast {
            uuid: uuid.to_string(),
        };
        let resp = self
            .request(reqwest::Method::DELETE, PODCASTS_PATH)?
            .json(&body)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    /// Submit the chapter-selection form as multipart fields.
    pub async fn generate_script(&self, request: &ScriptRequest) -> Result<(), ApiError> {
        let mut form = Form::new().text("podcast_uuid", request.podcast_uuid.clone());
        for chapter in &request.chapters {
            form = form.text("chapters", chapter.clone());
        }
        let resp = self
            .request(reqwest::Method::POST, GENERATE_SCRIPT_PATH)?
            .multipart(form)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    pub async fn save_transcript(&self, podcast_uuid: &str) -> Result<(), ApiError> {
        self.post_uuid(SAVE_TRANSCRIPT_PATH, podcast_uuid).await
    }

    pub async fn generate_podcast(&self, podcast_uuid: &str) -> Result<(), ApiError> {
        self.post_uuid(GENERATE_PODCAST_PATH, podcast_uuid).await
    }

    /// The uuid goes as a raw `text/plain` body.
    async fn post_uuid(&self, path: &str, podcast_uuid: &str) -> Result<(), ApiError> {
        let resp = self
            .request(reqwest::Method::POST, path)?
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(podcast_uuid.to_string())
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    // ── voices ───────────────────────────────────────────────────────────────

    /// Upload a recorded WAV as a custom voice.
    pub async fn upload_voice(&self, voice_name: &str, wav: Vec<u8>) -> Result<(), ApiError> {
        let part = Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", part)
            .text("voiceName", voice_name.to_string());
        let resp = self
            .request(reqwest::Method::POST, VOICE_UPLOAD_PATH)?
            .multipart(form)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    pub async fn delete_voice(&self, filepath: &str) -> Result<(), ApiError> {
        let body = DeleteVoice {
            filepath: filepath.to_string(),
        };
        let resp = self
            .request(reqwest::Method::DELETE, VOICE_DELETE_PATH)?
            .json(&body)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    pub async fn assign_voice(&self, assignment: &VoiceAssignment) -> Result<(), ApiError> {
        let resp = self
            .request(reqwest::Method::POST, VOICE_ASSIGN_PATH)?
            .json(assignment)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }
}

/// Turn a non-2xx response into `ApiError::Status`, keeping the backend's
/// `detail` when the body carries one.
async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .ok()
        .and_then(|e| e.detail)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        });
    Err(ApiError::Status { status, detail })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let resp = check(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
