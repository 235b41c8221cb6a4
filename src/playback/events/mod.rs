mod handle;

use crate::models::BaseItem;
use crate::playback::{
    MediaPlayerState, MediaPlayerSupplement, PlaybackItem, PlaybackRequestStatus,
};
pub use handle::EventHandle;
use std::sync::Arc;
use std::time::Duration;

/// Published state changes of a `MediaPlayerManager`
///
/// Every mutation of the manager's observable state produces exactly one of
/// these, in the order the mutations happened.
#[derive(Debug, Clone)]
pub enum MediaPlayerEvent {
    StateChanged(MediaPlayerState),
    /// Descriptor shown by the UI; changes before the item is resolved
    ItemChanged(BaseItem),
    PlaybackItemChanged(Option<Arc<PlaybackItem>>),
    PlaybackRequestStatusChanged(PlaybackRequestStatus),
    RateChanged(f32),
    SecondsChanged(Duration),
    TracksChanged {
        audio_stream_index: Option<i32>,
        subtitle_stream_index: Option<i32>,
    },
    SupplementsChanged(Vec<Arc<dyn MediaPlayerSupplement>>),
}
