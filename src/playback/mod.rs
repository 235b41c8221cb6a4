mod error;
pub mod events;
mod item;
pub mod manager;
pub mod progress;
mod provider;
pub mod proxy;
pub mod queue;
pub mod supplement;
pub mod timer;

pub use error::PlaybackError;
pub use events::{EventHandle, MediaPlayerEvent};
pub use item::{PlaybackItem, PreviewImageProvider};
pub use manager::{
    MediaPlayerAction, MediaPlayerManager, MediaPlayerManagerBuilder, MediaPlayerState,
    PlaybackRequestStatus, PlaybackSnapshot,
};
pub use progress::{MediaProgressObserver, PlaybackReport, PlaybackReporter, ProgressTracker};
pub use provider::{item_factory, ItemFactory, MediaPlayerItemProvider};
pub use proxy::{MediaPlayerProxy, ProxyCommand};
pub use queue::{ListQueue, MediaPlayerQueue};
pub use supplement::MediaPlayerSupplement;
pub use timer::PokeIntervalTimer;
