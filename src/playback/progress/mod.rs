mod observer;
mod reporter;

use crate::models::{duration_to_ticks, PlaystateInfo};
use crate::playback::{MediaPlayerEvent, MediaPlayerState, PlaybackItem, PlaybackRequestStatus};
pub use observer::MediaProgressObserver;
pub use reporter::{PlaybackReport, PlaybackReporter, DEFAULT_REPORT_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;

/// What the observer should do after feeding the tracker
#[derive(Debug, Default)]
pub struct TrackerOutput {
    pub reports: Vec<PlaybackReport>,
    /// Restart the report countdown
    pub poke: bool,
}

/// Decides which reports a stream of manager events calls for
///
/// Tracks one item at a time. The first report for an item is always a start,
/// later ones are progress reports carrying the paused flag, and the item is
/// closed with a stopped report when it is replaced, cleared, or the manager
/// stops. After a stop of the manager the tracker ignores everything.
#[derive(Debug)]
pub struct ProgressTracker {
    item: Option<Arc<PlaybackItem>>,
    has_sent_start: bool,
    status: PlaybackRequestStatus,
    seconds: Duration,
    audio_stream_index: Option<i32>,
    subtitle_stream_index: Option<i32>,
    finished: bool,
}

impl ProgressTracker {
    pub fn new(status: PlaybackRequestStatus, seconds: Duration) -> Self {
        Self {
            item: None,
            has_sent_start: false,
            status,
            seconds,
            audio_stream_index: None,
            subtitle_stream_index: None,
            finished: false,
        }
    }

    pub fn item(&self) -> Option<&Arc<PlaybackItem>> {
        self.item.as_ref()
    }

    pub fn has_sent_start(&self) -> bool {
        self.has_sent_start
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn handle_event(&mut self, event: &MediaPlayerEvent) -> TrackerOutput {
        if self.finished {
            return TrackerOutput::default();
        }

        match event {
            MediaPlayerEvent::PlaybackItemChanged(item) => self.item_changed(item.clone()),
            MediaPlayerEvent::PlaybackRequestStatusChanged(status) => {
                self.status = *status;
                TrackerOutput {
                    reports: self.current_report().into_iter().collect(),
                    poke: true,
                }
            }
            MediaPlayerEvent::SecondsChanged(seconds) => {
                self.seconds = *seconds;
                TrackerOutput::default()
            }
            MediaPlayerEvent::TracksChanged {
                audio_stream_index,
                subtitle_stream_index,
            } => {
                self.audio_stream_index = *audio_stream_index;
                self.subtitle_stream_index = *subtitle_stream_index;
                TrackerOutput::default()
            }
            MediaPlayerEvent::StateChanged(MediaPlayerState::Stopped) => self.finish(),
            _ => TrackerOutput::default(),
        }
    }

    /// Periodic tick from the report timer
    pub fn handle_timer(&mut self) -> TrackerOutput {
        if self.finished {
            return TrackerOutput::default();
        }
        TrackerOutput {
            reports: self.current_report().into_iter().collect(),
            poke: false,
        }
    }

    /// Close out the tracked item; no further reports follow
    pub fn finish(&mut self) -> TrackerOutput {
        if self.finished {
            return TrackerOutput::default();
        }
        self.finished = true;

        let reports = self.close_item().into_iter().collect();
        TrackerOutput {
            reports,
            poke: false,
        }
    }

    fn item_changed(&mut self, new_item: Option<Arc<PlaybackItem>>) -> TrackerOutput {
        let unchanged = match (&self.item, &new_item) {
            (Some(current), Some(new_item)) => Arc::ptr_eq(current, new_item),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return TrackerOutput::default();
        }

        let mut reports: Vec<PlaybackReport> = self.close_item().into_iter().collect();

        if let Some(item) = new_item {
            self.seconds = item.base_item.start_position();
            self.audio_stream_index = item.audio_stream_index;
            self.subtitle_stream_index = item.subtitle_stream_index;
            self.item = Some(item);
            reports.extend(self.current_report());
        }

        TrackerOutput {
            reports,
            poke: true,
        }
    }

    fn close_item(&mut self) -> Option<PlaybackReport> {
        let item = self.item.take()?;
        self.has_sent_start = false;
        Some(PlaybackReport::Stopped(self.info(&item)))
    }

    fn current_report(&mut self) -> Option<PlaybackReport> {
        let item = self.item.clone()?;
        let info = self.info(&item);

        if self.has_sent_start {
            Some(PlaybackReport::Progress(info))
        } else {
            self.has_sent_start = true;
            Some(PlaybackReport::Start(info))
        }
    }

    fn info(&self, item: &PlaybackItem) -> PlaystateInfo {
        PlaystateInfo {
            item_id: item.base_item.id.clone(),
            media_source_id: item.media_source.id.clone(),
            play_session_id: item.play_session_id.clone(),
            position_ticks: duration_to_ticks(self.seconds),
            is_paused: self.status == PlaybackRequestStatus::Paused,
            audio_stream_index: self.audio_stream_index,
            subtitle_stream_index: self.subtitle_stream_index,
        }
    }
}
