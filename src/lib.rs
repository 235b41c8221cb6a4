// Library exports for integration tests and reusable components

pub mod config;
pub mod jellyfin_client;
pub mod models;
pub mod playback;
pub mod session;

pub use playback::{
    MediaPlayerAction, MediaPlayerEvent, MediaPlayerManager, MediaPlayerState,
    PlaybackRequestStatus,
};
