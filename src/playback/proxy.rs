use std::time::Duration;

/// Transport controls of the media engine
///
/// The engine is owned by the UI layer; the manager only keeps a weak
/// reference and calls these after its own state is updated. Engine events
/// (ended, errors, position) come back through
/// [`MediaPlayerManager::send`](crate::playback::MediaPlayerManager::send) and
/// [`MediaPlayerManager::set_seconds`](crate::playback::MediaPlayerManager::set_seconds).
pub trait MediaPlayerProxy: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn set_time(&self, time: Duration);
    fn set_rate(&self, rate: f32);
    fn set_audio_track(&self, index: i32);
    /// `-1` disables subtitles
    fn set_subtitle_track(&self, index: i32);
}

/// A deferred call on a [`MediaPlayerProxy`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyCommand {
    Play,
    Pause,
    Stop,
    SetTime(Duration),
    SetRate(f32),
    SetAudioTrack(i32),
    SetSubtitleTrack(i32),
}

impl ProxyCommand {
    pub fn apply(&self, proxy: &dyn MediaPlayerProxy) {
        match self {
            ProxyCommand::Play => proxy.play(),
            ProxyCommand::Pause => proxy.pause(),
            ProxyCommand::Stop => proxy.stop(),
            ProxyCommand::SetTime(time) => proxy.set_time(*time),
            ProxyCommand::SetRate(rate) => proxy.set_rate(*rate),
            ProxyCommand::SetAudioTrack(index) => proxy.set_audio_track(*index),
            ProxyCommand::SetSubtitleTrack(index) => proxy.set_subtitle_track(*index),
        }
    }
}
