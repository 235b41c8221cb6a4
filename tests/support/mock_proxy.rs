use jellyplay::playback::{MediaPlayerProxy, ProxyCommand};
use std::sync::Mutex;
use std::time::Duration;

/// Proxy that records every transport call instead of driving an engine
#[derive(Default)]
pub struct MockProxy {
    calls: Mutex<Vec<ProxyCommand>>,
}

impl MockProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProxyCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, command: ProxyCommand) {
        self.calls.lock().unwrap().push(command);
    }
}

impl MediaPlayerProxy for MockProxy {
    fn play(&self) {
        self.record(ProxyCommand::Play);
    }

    fn pause(&self) {
        self.record(ProxyCommand::Pause);
    }

    fn stop(&self) {
        self.record(ProxyCommand::Stop);
    }

    fn set_time(&self, time: Duration) {
        self.record(ProxyCommand::SetTime(time));
    }

    fn set_rate(&self, rate: f32) {
        self.record(ProxyCommand::SetRate(rate));
    }

    fn set_audio_track(&self, index: i32) {
        self.record(ProxyCommand::SetAudioTrack(index));
    }

    fn set_subtitle_track(&self, index: i32) {
        self.record(ProxyCommand::SetSubtitleTrack(index));
    }
}
