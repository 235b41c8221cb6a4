use crate::config::ServerConfig;
use crate::models::{BaseItem, MediaSource, PlaystateInfo};
use crate::playback::{MediaPlayerItemProvider, PlaybackError, PlaybackItem};
use reqwest::{Client, Error as ReqwestError, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Missing configuration: {0}")]
    NotConfigured(&'static str),
    #[error("No playable media source for item {0}")]
    NoMediaSource(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Server endpoints receiving playback telemetry (allows mocking for tests)
#[async_trait::async_trait]
pub trait PlaystateClient: Send + Sync {
    async fn report_playback_start(&self, info: &PlaystateInfo) -> Result<(), ClientError>;
    async fn report_playback_progress(&self, info: &PlaystateInfo) -> Result<(), ClientError>;
    async fn report_playback_stopped(&self, info: &PlaystateInfo) -> Result<(), ClientError>;
}

/// Playback info request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackInfoRequest {
    user_id: Option<String>,
    max_streaming_bitrate: Option<u64>,
    start_time_ticks: i64,
    auto_open_live_stream: bool,
}

/// Playback info response wrapper
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackInfoResponse {
    #[serde(default)]
    media_sources: Vec<MediaSourceResponse>,
    play_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaSourceResponse {
    id: String,
    name: Option<String>,
    container: Option<String>,
    #[serde(default)]
    supports_direct_play: bool,
    #[serde(default)]
    supports_direct_stream: bool,
    transcoding_url: Option<String>,
    default_audio_stream_index: Option<i32>,
    default_subtitle_stream_index: Option<i32>,
}

impl From<MediaSourceResponse> for MediaSource {
    fn from(source: MediaSourceResponse) -> Self {
        MediaSource {
            id: source.id,
            name: source.name,
            container: source.container,
            supports_direct_play: source.supports_direct_play,
            supports_direct_stream: source.supports_direct_stream,
            transcoding_url: source.transcoding_url,
            default_audio_stream_index: source.default_audio_stream_index,
            default_subtitle_stream_index: source.default_subtitle_stream_index,
        }
    }
}

/// HTTP client for a Jellyfin server's playback endpoints
pub struct JellyfinClient {
    client: Client,
    server_url: Url,
    config: ServerConfig,
}

impl JellyfinClient {
    pub fn new(config: ServerConfig) -> Result<Self, ClientError> {
        let server_url = config
            .server_url
            .as_deref()
            .ok_or(ClientError::NotConfigured("server URL"))?;
        let server_url =
            Url::parse(server_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            server_url,
            config,
        })
    }

    /// `MediaBrowser` authorization header identifying this client and device
    pub fn authorization_header(&self) -> String {
        let mut header = format!(
            "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
            self.config.client_name,
            self.config.device_name,
            self.config.device_id,
            self.config.client_version
        );
        if let Some(token) = &self.config.access_token {
            header.push_str(&format!(", Token=\"{}\"", token));
        }
        header
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.server_url.as_str().trim_end_matches('/');
        let url = format!("{}/{}", base, path.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn post_playstate(&self, path: &str, info: &PlaystateInfo) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        debug!("POST {} for item {}", url, info.item_id);

        let response = self
            .client
            .post(url)
            .header("Authorization", self.authorization_header())
            .json(info)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Negotiate a stream for `item` and build the playable item
    pub async fn resolve_playback_item(&self, item: BaseItem) -> Result<PlaybackItem, ClientError> {
        let url = self.endpoint(&format!("Items/{}/PlaybackInfo", item.id))?;
        let request = PlaybackInfoRequest {
            user_id: self.config.user_id.clone(),
            max_streaming_bitrate: self.config.max_streaming_bitrate,
            start_time_ticks: crate::models::duration_to_ticks(item.start_position()),
            auto_open_live_stream: true,
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", self.authorization_header())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let playback_info: PlaybackInfoResponse = serde_json::from_str(&body)?;

        let source: MediaSource = playback_info
            .media_sources
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NoMediaSource(item.id.clone()))?
            .into();
        let play_session_id = playback_info
            .play_session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let stream_url = self.stream_url(&item.id, &source, &play_session_id)?;

        info!(
            "Resolved item {} to source {} (session {})",
            item.id, source.id, play_session_id
        );

        Ok(PlaybackItem::new(item, source, play_session_id, stream_url.to_string())
            .with_requested_bitrate(self.config.max_streaming_bitrate))
    }

    /// Direct stream URL when the source allows it, the server's transcoding URL otherwise
    pub fn stream_url(
        &self,
        item_id: &str,
        source: &MediaSource,
        play_session_id: &str,
    ) -> Result<Url, ClientError> {
        if source.supports_direct_play || source.supports_direct_stream {
            let mut url = self.endpoint(&format!("Videos/{}/stream", item_id))?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("static", "true")
                    .append_pair("mediaSourceId", &source.id)
                    .append_pair("playSessionId", play_session_id)
                    .append_pair("deviceId", &self.config.device_id);
                if let Some(container) = &source.container {
                    query.append_pair("container", container);
                }
                if let Some(token) = &self.config.access_token {
                    query.append_pair("api_key", token);
                }
            }
            return Ok(url);
        }

        match &source.transcoding_url {
            Some(path) => self.endpoint(path),
            None => Err(ClientError::NoMediaSource(item_id.to_string())),
        }
    }

    /// Provider whose factory resolves through this client
    pub fn provider(self: &Arc<Self>, item: BaseItem) -> MediaPlayerItemProvider {
        let client = self.clone();
        MediaPlayerItemProvider::new(item, move |item| {
            let client = client.clone();
            async move {
                client
                    .resolve_playback_item(item)
                    .await
                    .map_err(PlaybackError::from)
            }
        })
    }
}

#[async_trait::async_trait]
impl PlaystateClient for JellyfinClient {
    async fn report_playback_start(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.post_playstate("Sessions/Playing", info).await
    }

    async fn report_playback_progress(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.post_playstate("Sessions/Playing/Progress", info).await
    }

    async fn report_playback_stopped(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.post_playstate("Sessions/Playing/Stopped", info).await
    }
}
