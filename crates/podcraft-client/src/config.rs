use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;
use super::status::ConflictPolicy;

/// Overrides `server.base_url` when set.
pub const SERVER_ENV: &str = "PODCRAFT_SERVER";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// No timeout unless set.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Status stream subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Reopen the status stream after an error.  Off by default: an errored
    /// subscription stays closed.
    #[serde(default)]
    pub reconnect: bool,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit mpv binary; falls back to a PATH lookup.
    #[serde(default)]
    pub mpv_path: Option<PathBuf>,
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_voice_name")]
    pub default_voice_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: false,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_attempts: 0,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_path: None,
            seek_step_secs: default_seek_step(),
            volume: default_volume(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            default_voice_name: default_voice_name(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_seek_step() -> f64 {
    10.0
}

fn default_volume() -> f32 {
    0.8
}

fn default_voice_name() -> String {
    "unnamed_voice".to_string()
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl StreamConfig {
    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// when no further attempt should be made.
    ///
    /// The delay doubles from `initial_backoff_ms` and is capped at
    /// `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if !self.reconnect || attempt == 0 {
            return None;
        }
        if self.max_attempts > 0 && attempt > self.max_attempts {
            return None;
        }
        let shift = (attempt - 1).min(31);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Some(Duration::from_millis(delay))
    }
}

impl Config {
    /// Load the config file, writing defaults on first run.  The
    /// `PODCRAFT_SERVER` environment variable overrides the base URL.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        };

        if let Ok(url) = std::env::var(SERVER_ENV) {
            if !url.trim().is_empty() {
                config.server.base_url = url.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8000");
        assert!(config.server.request_timeout().is_none());
        assert!(!config.stream.reconnect);
        assert_eq!(config.stream.conflict_policy, ConflictPolicy::PreferGenerating);
        assert_eq!(config.player.seek_step_secs, 10.0);
        assert_eq!(config.recorder.default_voice_name, "unnamed_voice");
        assert!(Config::config_path().ends_with("podcraft/config.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://studio.local:9000"

            [stream]
            reconnect = true
            conflict_policy = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "http://studio.local:9000");
        assert!(config.stream.reconnect);
        assert_eq!(config.stream.initial_backoff_ms, 500);
        assert_eq!(config.stream.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(config.player.volume, 0.8);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.server.request_timeout_secs = Some(20);
        config.stream.max_attempts = 3;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.server.request_timeout_secs, Some(20));
        assert_eq!(back.stream.max_attempts, 3);
    }

    #[test]
    fn test_backoff_disabled_by_default() {
        let stream = StreamConfig::default();
        assert_eq!(stream.backoff(1), None);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let stream = StreamConfig {
            reconnect: true,
            initial_backoff_ms: 500,
            max_backoff_ms: 3_000,
            ..Default::default()
        };
        assert_eq!(stream.backoff(1), Some(Duration::from_millis(500)));
        assert_eq!(stream.backoff(2), Some(Duration::from_millis(1_000)));
        assert_eq!(stream.backoff(3), Some(Duration::from_millis(2_000)));
        assert_eq!(stream.backoff(4), Some(Duration::from_millis(3_000)));
        assert_eq!(stream.backoff(60), Some(Duration::from_millis(3_000)));
    }

    #[test]
    fn test_backoff_stops_after_max_attempts() {
        let stream = StreamConfig {
            reconnect: true,
            max_attempts: 2,
            ..Default::default()
        };
        assert!(stream.backoff(2).is_some());
        assert_eq!(stream.backoff(3), None);
    }
}
