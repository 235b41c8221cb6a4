use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Default tolerance applied to the engine's end-of-media signal
pub const DEFAULT_END_TOLERANCE: Duration = Duration::from_secs(1);

/// Default bound on a single HTTP request to the server
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cadence of periodic progress reports
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Application configuration
/// Loads from a .env file when one is present, then from the process environment
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub playback: PlaybackConfig,
}

/// Connection details for the media server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Base URL of the server, e.g. `https://media.example.com`
    pub server_url: Option<String>,
    pub access_token: Option<String>,
    /// User the playback-info requests are made for
    pub user_id: Option<String>,
    pub client_name: String,
    pub client_version: String,
    pub device_name: String,
    pub device_id: String,
    /// Upper bound handed to the server when negotiating a stream
    pub max_streaming_bitrate: Option<u64>,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            server_url: None,
            access_token: None,
            user_id: None,
            client_name: "jellyplay".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: "jellyplay".to_string(),
            device_id: uuid::Uuid::new_v4().to_string(),
            max_streaming_bitrate: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Tunables for the playback manager and progress reporting
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Advance to the queue's next item when an item genuinely ends
    pub autoplay: bool,
    /// Remaining runtime under which an "ended" signal is trusted
    pub end_tolerance: Duration,
    /// Period of progress reports while an item is tracked
    pub progress_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            autoplay: true,
            end_tolerance: DEFAULT_END_TOLERANCE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from `.env` (if present) and the environment
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Config: loaded {}", path.display()),
            Err(_) => info!("Config: no .env file found, using process environment"),
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerConfig::default();
        let playback_defaults = PlaybackConfig::default();

        let server = ServerConfig {
            server_url: lookup("JELLYPLAY_SERVER_URL").filter(|v| !v.trim().is_empty()),
            access_token: lookup("JELLYPLAY_ACCESS_TOKEN"),
            user_id: lookup("JELLYPLAY_USER_ID"),
            device_name: lookup("JELLYPLAY_DEVICE_NAME").unwrap_or(server_defaults.device_name),
            device_id: lookup("JELLYPLAY_DEVICE_ID").unwrap_or(server_defaults.device_id),
            max_streaming_bitrate: parse_value(&lookup, "JELLYPLAY_MAX_BITRATE"),
            request_timeout: parse_value(&lookup, "JELLYPLAY_REQUEST_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(server_defaults.request_timeout),
            ..server_defaults
        };

        let playback = PlaybackConfig {
            autoplay: parse_value(&lookup, "JELLYPLAY_AUTOPLAY")
                .unwrap_or(playback_defaults.autoplay),
            end_tolerance: parse_value(&lookup, "JELLYPLAY_END_TOLERANCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(playback_defaults.end_tolerance),
            progress_interval: parse_value(&lookup, "JELLYPLAY_PROGRESS_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(playback_defaults.progress_interval),
        };

        if let Some(url) = &server.server_url {
            info!("Config: server {}", url);
        }

        Config { server, playback }
    }
}

fn parse_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_lowercase().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Config: ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}
