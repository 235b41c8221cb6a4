use crate::models::{BaseItem, MediaSource};
use crate::playback::MediaPlayerManager;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

/// Source of scrubbing preview images for an item
#[async_trait::async_trait]
pub trait PreviewImageProvider: Send + Sync {
    /// Warm whatever cache backs the preview image at `position`
    async fn prefetch(&self, position: Duration);
}

/// A fully resolved, ready to stream item
///
/// Owned by the manager once assigned and replaced wholesale on every item
/// change, so `Arc::ptr_eq` identifies "the same item".
pub struct PlaybackItem {
    pub base_item: BaseItem,
    pub media_source: MediaSource,
    /// Correlates this attempt's start/progress/stopped reports on the server
    pub play_session_id: String,
    pub url: String,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    pub requested_bitrate: Option<u64>,
    preview_images: Option<Arc<dyn PreviewImageProvider>>,
    manager: RwLock<Weak<MediaPlayerManager>>,
}

impl PlaybackItem {
    pub fn new(
        base_item: BaseItem,
        media_source: MediaSource,
        play_session_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let audio_stream_index = media_source.default_audio_stream_index;
        let subtitle_stream_index = media_source.default_subtitle_stream_index;

        PlaybackItem {
            base_item,
            media_source,
            play_session_id: play_session_id.into(),
            url: url.into(),
            audio_stream_index,
            subtitle_stream_index,
            requested_bitrate: None,
            preview_images: None,
            manager: RwLock::new(Weak::new()),
        }
    }

    pub fn with_tracks(mut self, audio: Option<i32>, subtitle: Option<i32>) -> Self {
        self.audio_stream_index = audio;
        self.subtitle_stream_index = subtitle;
        self
    }

    pub fn with_requested_bitrate(mut self, bitrate: Option<u64>) -> Self {
        self.requested_bitrate = bitrate;
        self
    }

    pub fn with_preview_images(mut self, provider: Arc<dyn PreviewImageProvider>) -> Self {
        self.preview_images = Some(provider);
        self
    }

    pub fn preview_images(&self) -> Option<Arc<dyn PreviewImageProvider>> {
        self.preview_images.clone()
    }

    /// The manager currently playing this item, if it is still alive
    pub fn manager(&self) -> Option<Arc<MediaPlayerManager>> {
        self.manager.read().unwrap().upgrade()
    }

    pub(crate) fn attach_manager(&self, manager: Weak<MediaPlayerManager>) {
        *self.manager.write().unwrap() = manager;
    }
}

impl fmt::Debug for PlaybackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackItem")
            .field("item_id", &self.base_item.id)
            .field("media_source_id", &self.media_source.id)
            .field("play_session_id", &self.play_session_id)
            .field("url", &self.url)
            .field("audio_stream_index", &self.audio_stream_index)
            .field("subtitle_stream_index", &self.subtitle_stream_index)
            .finish_non_exhaustive()
    }
}
