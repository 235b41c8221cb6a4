use crate::config::PlaybackConfig;
use crate::models::BaseItem;
use crate::playback::supplement::supplements_for;
use crate::playback::{
    EventHandle, MediaPlayerEvent, MediaPlayerItemProvider, MediaPlayerProxy, MediaPlayerQueue,
    MediaPlayerSupplement, PlaybackError, PlaybackItem, ProxyCommand,
};
use crate::session::SessionRegistry;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Lifecycle of a playback session
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPlayerState {
    Initial,
    LoadingItem,
    Playback,
    Error(PlaybackError),
    Stopped,
}

/// What the user asked for, independent of what the engine is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRequestStatus {
    Playing,
    Paused,
}

impl PlaybackRequestStatus {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackRequestStatus::Playing => PlaybackRequestStatus::Paused,
            PlaybackRequestStatus::Paused => PlaybackRequestStatus::Playing,
        }
    }
}

/// Everything that can change a manager's state
#[derive(Debug, Clone)]
pub enum MediaPlayerAction {
    /// Resolve the provider given at construction
    Start,
    PlayNewItem(MediaPlayerItemProvider),
    /// The engine reached the end of the media
    Ended,
    Error(PlaybackError),
    SetPlaybackRequestStatus(PlaybackRequestStatus),
    /// Publishes the rate; pushing it to the engine is up to the caller
    SetRate(f32),
    TogglePlayPause,
    Seek(Duration),
    SetAudioTrack(i32),
    /// `-1` disables subtitles
    SetSubtitleTrack(i32),
    SetQueue(Option<Arc<dyn MediaPlayerQueue>>),
    PlayNext,
    PlayPrevious,
    Stop,
}

/// Published state read together with a subscription
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub state: MediaPlayerState,
    pub playback_item: Option<Arc<PlaybackItem>>,
    pub playback_request_status: PlaybackRequestStatus,
    pub seconds: Duration,
}

struct ManagerData {
    state: MediaPlayerState,
    item: Option<BaseItem>,
    playback_item: Option<Arc<PlaybackItem>>,
    seconds: Duration,
    playback_request_status: PlaybackRequestStatus,
    rate: f32,
    audio_stream_index: Option<i32>,
    subtitle_stream_index: Option<i32>,
    queue: Option<Arc<dyn MediaPlayerQueue>>,
    supplements: Vec<Arc<dyn MediaPlayerSupplement>>,
    initial_provider: Option<MediaPlayerItemProvider>,
    /// Bumped whenever a resolution starts or is cancelled
    generation: u64,
    resolution: Option<JoinHandle<()>>,
}

/// Side effects collected under the lock and run after it is released
#[derive(Default)]
struct Effects {
    commands: Vec<ProxyCommand>,
    release_session: bool,
}

/// State machine and orchestration hub of one playback session
///
/// All state changes go through [`send`](Self::send) (plus the engine's
/// position feed, [`set_seconds`](Self::set_seconds)) and are published as
/// [`MediaPlayerEvent`]s. Transitions happen synchronously; only item
/// resolution runs as a task, and at most one resolution is in flight.
pub struct MediaPlayerManager {
    id: Uuid,
    config: PlaybackConfig,
    data: Mutex<ManagerData>,
    proxy: RwLock<Option<Weak<dyn MediaPlayerProxy>>>,
    events: EventHandle<MediaPlayerEvent>,
    registry: Option<Arc<SessionRegistry>>,
    runtime_handle: tokio::runtime::Handle,
    this: Weak<MediaPlayerManager>,
}

/// Construction options for a [`MediaPlayerManager`]
pub struct MediaPlayerManagerBuilder {
    config: PlaybackConfig,
    runtime_handle: tokio::runtime::Handle,
    provider: Option<MediaPlayerItemProvider>,
    playback_item: Option<PlaybackItem>,
    queue: Option<Arc<dyn MediaPlayerQueue>>,
    registry: Option<Arc<SessionRegistry>>,
}

impl MediaPlayerManagerBuilder {
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Provider resolved by [`MediaPlayerAction::Start`]
    pub fn provider(mut self, provider: MediaPlayerItemProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Start directly in playback with an already resolved item
    pub fn playback_item(mut self, item: PlaybackItem) -> Self {
        self.playback_item = Some(item);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn MediaPlayerQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Register the session as the current one for its lifetime
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Arc<MediaPlayerManager> {
        let initial_item = self
            .provider
            .as_ref()
            .map(|provider| provider.item().clone());

        let manager = Arc::new_cyclic(|this| MediaPlayerManager {
            id: Uuid::new_v4(),
            config: self.config,
            data: Mutex::new(ManagerData {
                state: MediaPlayerState::Initial,
                item: initial_item,
                playback_item: None,
                seconds: Duration::ZERO,
                playback_request_status: PlaybackRequestStatus::Playing,
                rate: 1.0,
                audio_stream_index: None,
                subtitle_stream_index: None,
                queue: self.queue,
                supplements: Vec::new(),
                initial_provider: self.provider,
                generation: 0,
                resolution: None,
            }),
            proxy: RwLock::new(None),
            events: EventHandle::new(),
            registry: self.registry,
            runtime_handle: self.runtime_handle,
            this: this.clone(),
        });

        if let Some(item) = self.playback_item {
            let mut data = manager.data.lock().unwrap();
            manager.assign_playback_item(&mut data, Arc::new(item));
            manager.set_state(&mut data, MediaPlayerState::Playback);
        }

        if let Some(registry) = &manager.registry {
            registry.register(&manager);
        }

        info!("Playback session {} created", manager.id);
        manager
    }
}

impl MediaPlayerManager {
    pub fn builder(runtime_handle: tokio::runtime::Handle) -> MediaPlayerManagerBuilder {
        MediaPlayerManagerBuilder {
            config: PlaybackConfig::default(),
            runtime_handle,
            provider: None,
            playback_item: None,
            queue: None,
            registry: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Attach the engine; only a weak reference is kept
    pub fn set_proxy(&self, proxy: &Arc<dyn MediaPlayerProxy>) {
        *self.proxy.write().unwrap() = Some(Arc::downgrade(proxy));
    }

    pub fn proxy(&self) -> Option<Arc<dyn MediaPlayerProxy>> {
        self.proxy.read().unwrap().as_ref().and_then(Weak::upgrade)
    }

    /// Receive every published state change from now on
    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<MediaPlayerEvent> {
        self.events.subscribe()
    }

    /// Subscribe and read the current state in one step
    ///
    /// Events are published with the state lock held, so the receiver sees
    /// exactly the changes made after the snapshot.
    pub fn subscribe_with_snapshot(
        &self,
    ) -> (tokio_mpsc::UnboundedReceiver<MediaPlayerEvent>, PlaybackSnapshot) {
        let data = self.data.lock().unwrap();
        let events = self.events.subscribe();
        let snapshot = PlaybackSnapshot {
            state: data.state.clone(),
            playback_item: data.playback_item.clone(),
            playback_request_status: data.playback_request_status,
            seconds: data.seconds,
        };
        (events, snapshot)
    }

    pub fn state(&self) -> MediaPlayerState {
        self.data.lock().unwrap().state.clone()
    }

    /// Item shown to the user; updated before resolution completes
    pub fn item(&self) -> Option<BaseItem> {
        self.data.lock().unwrap().item.clone()
    }

    pub fn playback_item(&self) -> Option<Arc<PlaybackItem>> {
        self.data.lock().unwrap().playback_item.clone()
    }

    pub fn seconds(&self) -> Duration {
        self.data.lock().unwrap().seconds
    }

    pub fn playback_request_status(&self) -> PlaybackRequestStatus {
        self.data.lock().unwrap().playback_request_status
    }

    pub fn rate(&self) -> f32 {
        self.data.lock().unwrap().rate
    }

    pub fn tracks(&self) -> (Option<i32>, Option<i32>) {
        let data = self.data.lock().unwrap();
        (data.audio_stream_index, data.subtitle_stream_index)
    }

    pub fn queue(&self) -> Option<Arc<dyn MediaPlayerQueue>> {
        self.data.lock().unwrap().queue.clone()
    }

    pub fn supplements(&self) -> Vec<Arc<dyn MediaPlayerSupplement>> {
        self.data.lock().unwrap().supplements.clone()
    }

    /// Whether an item resolution task is outstanding
    pub fn is_resolving(&self) -> bool {
        self.data.lock().unwrap().resolution.is_some()
    }

    /// Position feed from the engine
    pub fn set_seconds(&self, seconds: Duration) {
        let mut data = self.data.lock().unwrap();
        data.seconds = seconds;
        self.events.publish(MediaPlayerEvent::SecondsChanged(seconds));
    }

    pub fn send(&self, action: MediaPlayerAction) {
        trace!("Session {} action: {:?}", self.id, action);
        let mut effects = Effects::default();
        {
            let mut data = self.data.lock().unwrap();
            self.handle(&mut data, action, &mut effects);
        }
        self.apply(effects);
    }

    fn handle(&self, data: &mut ManagerData, action: MediaPlayerAction, effects: &mut Effects) {
        match action {
            MediaPlayerAction::Start => self.start(data, effects),
            MediaPlayerAction::PlayNewItem(provider) => self.play_new_item(data, provider, effects),
            MediaPlayerAction::Ended => self.ended(data, effects),
            MediaPlayerAction::Error(err) => self.fail(data, err, effects),
            MediaPlayerAction::SetPlaybackRequestStatus(status) => {
                self.set_playback_request_status(data, status, effects)
            }
            MediaPlayerAction::SetRate(rate) => {
                if data.rate != rate {
                    data.rate = rate;
                    self.events.publish(MediaPlayerEvent::RateChanged(rate));
                }
            }
            MediaPlayerAction::TogglePlayPause => {
                let status = data.playback_request_status.toggled();
                self.set_playback_request_status(data, status, effects);
            }
            MediaPlayerAction::Seek(seconds) => {
                data.seconds = seconds;
                self.events.publish(MediaPlayerEvent::SecondsChanged(seconds));
                effects.commands.push(ProxyCommand::SetTime(seconds));
            }
            MediaPlayerAction::SetAudioTrack(index) => {
                if data.audio_stream_index != Some(index) {
                    data.audio_stream_index = Some(index);
                    self.publish_tracks(data);
                    effects.commands.push(ProxyCommand::SetAudioTrack(index));
                }
            }
            MediaPlayerAction::SetSubtitleTrack(index) => {
                if data.subtitle_stream_index != Some(index) {
                    data.subtitle_stream_index = Some(index);
                    self.publish_tracks(data);
                    effects.commands.push(ProxyCommand::SetSubtitleTrack(index));
                }
            }
            MediaPlayerAction::SetQueue(queue) => {
                data.queue = queue;
                if let Some(item) = data.playback_item.clone() {
                    self.refresh_supplements(data, &item.base_item);
                }
            }
            MediaPlayerAction::PlayNext => {
                let provider = self.neighbour(data, |queue, item| queue.next_item(item));
                match provider {
                    Some(provider) => self.play_new_item(data, provider, effects),
                    None => debug!("Session {}: no next item in queue", self.id),
                }
            }
            MediaPlayerAction::PlayPrevious => {
                let provider = self.neighbour(data, |queue, item| queue.previous_item(item));
                match provider {
                    Some(provider) => self.play_new_item(data, provider, effects),
                    None => debug!("Session {}: no previous item in queue", self.id),
                }
            }
            MediaPlayerAction::Stop => self.stop(data, effects),
        }
    }

    fn start(&self, data: &mut ManagerData, effects: &mut Effects) {
        match data.initial_provider.take() {
            Some(provider) => {
                self.show_item(data, provider.item().clone());
                self.set_state(data, MediaPlayerState::LoadingItem);
                self.begin_resolution(data, provider);
            }
            None if data.playback_item.is_some() => {
                debug!("Session {}: start with an item already playing", self.id);
            }
            None => {
                debug!("Session {}: start without a provider, stopping", self.id);
                self.stop(data, effects);
            }
        }
    }

    fn play_new_item(
        &self,
        data: &mut ManagerData,
        provider: MediaPlayerItemProvider,
        effects: &mut Effects,
    ) {
        info!(
            "Session {}: playing new item {}",
            self.id,
            provider.item().id
        );
        self.show_item(data, provider.item().clone());
        effects.commands.push(ProxyCommand::Stop);
        self.clear_playback_item(data);
        self.set_state(data, MediaPlayerState::LoadingItem);
        self.begin_resolution(data, provider);
    }

    fn ended(&self, data: &mut ManagerData, effects: &mut Effects) {
        let Some(item) = data.playback_item.clone() else {
            debug!("Session {}: ended without a playback item", self.id);
            return;
        };

        let Some(runtime) = item.base_item.runtime else {
            debug!("Session {}: ended with unknown runtime, stopping", self.id);
            self.stop(data, effects);
            return;
        };

        // The engine reports "ended" early and unreliably
        let remaining = runtime.saturating_sub(data.seconds);
        if remaining > self.config.end_tolerance {
            debug!(
                "Session {}: ignoring ended with {:?} remaining",
                self.id, remaining
            );
            return;
        }

        if self.config.autoplay {
            if let Some(next) = self.neighbour(data, |queue, item| queue.next_item(item)) {
                self.play_new_item(data, next, effects);
                return;
            }
        }

        self.stop(data, effects);
    }

    fn fail(&self, data: &mut ManagerData, err: PlaybackError, effects: &mut Effects) {
        let (item_id, play_session_id) = match &data.playback_item {
            Some(item) => (
                item.base_item.id.clone(),
                Some(item.play_session_id.clone()),
            ),
            None => (
                data.item.as_ref().map(|i| i.id.clone()).unwrap_or_default(),
                None,
            ),
        };
        error!(
            session = %self.id,
            item_id = %item_id,
            play_session_id = ?play_session_id,
            "Playback error: {}",
            err
        );

        self.cancel_resolution(data);
        effects.commands.push(ProxyCommand::Stop);
        effects.release_session = true;
        self.clear_playback_item(data);
        self.set_state(data, MediaPlayerState::Error(err));
    }

    fn stop(&self, data: &mut ManagerData, effects: &mut Effects) {
        info!("Session {}: stopping", self.id);
        self.cancel_resolution(data);
        effects.commands.push(ProxyCommand::Stop);
        effects.release_session = true;
        self.set_state(data, MediaPlayerState::Stopped);
        self.clear_playback_item(data);
    }

    fn set_playback_request_status(
        &self,
        data: &mut ManagerData,
        status: PlaybackRequestStatus,
        effects: &mut Effects,
    ) {
        if data.playback_request_status == status {
            return;
        }

        data.playback_request_status = status;
        self.events
            .publish(MediaPlayerEvent::PlaybackRequestStatusChanged(status));
        effects.commands.push(match status {
            PlaybackRequestStatus::Playing => ProxyCommand::Play,
            PlaybackRequestStatus::Paused => ProxyCommand::Pause,
        });
    }

    fn neighbour<F>(&self, data: &ManagerData, pick: F) -> Option<MediaPlayerItemProvider>
    where
        F: FnOnce(&dyn MediaPlayerQueue, &BaseItem) -> Option<MediaPlayerItemProvider>,
    {
        let queue = data.queue.as_ref()?;
        let current = data
            .playback_item
            .as_ref()
            .map(|item| &item.base_item)
            .or(data.item.as_ref())?;
        pick(queue.as_ref(), current)
    }

    fn begin_resolution(&self, data: &mut ManagerData, provider: MediaPlayerItemProvider) {
        self.cancel_resolution(data);
        let generation = data.generation;
        let this = self.this.clone();

        debug!(
            "Session {}: resolving {} (generation {})",
            self.id,
            provider.item().id,
            generation
        );
        let task = self.runtime_handle.spawn(async move {
            let result = provider.resolve().await;
            if let Some(manager) = this.upgrade() {
                manager.finish_resolution(generation, result);
            }
        });
        data.resolution = Some(task);
    }

    fn cancel_resolution(&self, data: &mut ManagerData) {
        data.generation += 1;
        if let Some(task) = data.resolution.take() {
            debug!("Session {}: cancelling in-flight resolution", self.id);
            task.abort();
        }
    }

    fn finish_resolution(&self, generation: u64, result: Result<PlaybackItem, PlaybackError>) {
        let mut effects = Effects::default();
        {
            let mut data = self.data.lock().unwrap();
            if data.generation != generation {
                debug!(
                    "Session {}: discarding stale resolution (generation {})",
                    self.id, generation
                );
                return;
            }
            data.resolution = None;

            match result {
                Ok(item) => {
                    self.assign_playback_item(&mut data, Arc::new(item));
                    self.set_state(&mut data, MediaPlayerState::Playback);
                }
                Err(err) => self.fail(&mut data, err, &mut effects),
            }
        }
        self.apply(effects);
    }

    /// Make `item` the current playback item and derive everything that hangs off it
    fn assign_playback_item(&self, data: &mut ManagerData, item: Arc<PlaybackItem>) {
        item.attach_manager(self.this.clone());

        let start = item.base_item.start_position();
        data.playback_item = Some(item.clone());
        self.events
            .publish(MediaPlayerEvent::PlaybackItemChanged(Some(item.clone())));
        self.show_item(data, item.base_item.clone());

        data.seconds = start;
        self.events.publish(MediaPlayerEvent::SecondsChanged(start));

        data.audio_stream_index = item.audio_stream_index;
        data.subtitle_stream_index = item.subtitle_stream_index;
        self.publish_tracks(data);

        self.refresh_supplements(data, &item.base_item);

        if let Some(preview_images) = item.preview_images() {
            self.runtime_handle.spawn(async move {
                preview_images.prefetch(start).await;
            });
        }

        debug!(
            "Session {}: assigned {:?} at {:?}",
            self.id, item, start
        );
    }

    fn clear_playback_item(&self, data: &mut ManagerData) {
        if data.playback_item.take().is_some() {
            self.events.publish(MediaPlayerEvent::PlaybackItemChanged(None));
        }
    }

    fn show_item(&self, data: &mut ManagerData, item: BaseItem) {
        data.item = Some(item.clone());
        self.events.publish(MediaPlayerEvent::ItemChanged(item));
    }

    fn refresh_supplements(&self, data: &mut ManagerData, item: &BaseItem) {
        data.supplements = supplements_for(item, data.queue.as_ref());
        self.events
            .publish(MediaPlayerEvent::SupplementsChanged(data.supplements.clone()));
    }

    fn publish_tracks(&self, data: &ManagerData) {
        self.events.publish(MediaPlayerEvent::TracksChanged {
            audio_stream_index: data.audio_stream_index,
            subtitle_stream_index: data.subtitle_stream_index,
        });
    }

    fn set_state(&self, data: &mut ManagerData, state: MediaPlayerState) {
        if data.state == state {
            return;
        }
        debug!(
            "Session {}: {:?} -> {:?}",
            self.id, data.state, state
        );
        data.state = state.clone();
        self.events.publish(MediaPlayerEvent::StateChanged(state));
    }

    fn apply(&self, effects: Effects) {
        if !effects.commands.is_empty() {
            match self.proxy() {
                Some(proxy) => {
                    for command in &effects.commands {
                        command.apply(proxy.as_ref());
                    }
                }
                None => trace!(
                    "Session {}: no proxy attached, dropping {:?}",
                    self.id,
                    effects.commands
                ),
            }
        }

        if effects.release_session {
            if let Some(registry) = &self.registry {
                registry.release(self.id);
            }
        }
    }
}

impl Drop for MediaPlayerManager {
    fn drop(&mut self) {
        if let Ok(data) = self.data.get_mut() {
            if let Some(task) = data.resolution.take() {
                task.abort();
            }
        }
    }
}
