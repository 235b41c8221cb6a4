use serde::Serialize;
use std::time::Duration;

/// Server time unit: one tick is 100 nanoseconds
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a duration to server ticks
pub fn duration_to_ticks(duration: Duration) -> i64 {
    let ticks = duration.as_nanos() / 100;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

/// Convert server ticks to a duration, clamping negative values to zero
pub fn ticks_to_duration(ticks: i64) -> Duration {
    let ticks = u64::try_from(ticks).unwrap_or(0);
    Duration::from_nanos(ticks.saturating_mul(100))
}

/// Kind of library item being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemKind {
    #[default]
    Movie,
    Episode,
    Audio,
    Video,
}

/// A chapter marker within an item
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterInfo {
    pub name: String,
    pub start: Duration,
}

/// Descriptor of a library item, as browsed by the user
///
/// This is what a provider resolves into a playable [`crate::playback::PlaybackItem`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub runtime: Option<Duration>,
    /// Saved position to resume from
    pub resume_position: Option<Duration>,
    pub chapters: Vec<ChapterInfo>,
    pub series_id: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl BaseItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        BaseItem {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_runtime(mut self, runtime: Duration) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_resume_position(mut self, position: Duration) -> Self {
        self.resume_position = Some(position);
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<ChapterInfo>) -> Self {
        self.chapters = chapters;
        self
    }

    /// Position playback starts from when this item is assigned
    pub fn start_position(&self) -> Duration {
        self.resume_position.unwrap_or(Duration::ZERO)
    }

    /// "S01E02 - Name" for episodes, the plain name otherwise
    pub fn display_title(&self) -> String {
        match (self.kind, self.season_number, self.episode_number) {
            (ItemKind::Episode, Some(season), Some(episode)) => {
                format!("S{:02}E{:02} - {}", season, episode, self.name)
            }
            _ => self.name.clone(),
        }
    }
}

/// A concrete variant of an item the server can stream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaSource {
    pub id: String,
    pub name: Option<String>,
    pub container: Option<String>,
    pub supports_direct_play: bool,
    pub supports_direct_stream: bool,
    /// Server-relative URL of a transcoding session
    pub transcoding_url: Option<String>,
    pub default_audio_stream_index: Option<i32>,
    pub default_subtitle_stream_index: Option<i32>,
}

/// Body of a playback start/progress/stopped report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaystateInfo {
    pub item_id: String,
    pub media_source_id: String,
    pub play_session_id: String,
    pub position_ticks: i64,
    pub is_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_stream_index: Option<i32>,
}
