use crate::jellyfin_client::ClientError;
use thiserror::Error;

/// Failures that stop playback and are published as `MediaPlayerState::Error`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Failed to resolve playback item: {0}")]
    Resolution(String),
    #[error("No playable media source for item {0}")]
    NoMediaSource(String),
    #[error("Playback engine error: {0}")]
    Engine(String),
}

impl From<ClientError> for PlaybackError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NoMediaSource(item_id) => PlaybackError::NoMediaSource(item_id),
            other => PlaybackError::Resolution(other.to_string()),
        }
    }
}
