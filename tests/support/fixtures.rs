use jellyplay::models::{BaseItem, ChapterInfo, MediaSource};
use jellyplay::playback::{
    item_factory, ItemFactory, MediaPlayerEvent, MediaPlayerItemProvider, PlaybackError,
    PlaybackItem,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Instant};

/// Item with a one hour runtime
pub fn movie(id: &str) -> BaseItem {
    BaseItem::new(id, format!("Movie {}", id)).with_runtime(Duration::from_secs(3600))
}

pub fn episode(id: &str) -> BaseItem {
    BaseItem::new(id, format!("Episode {}", id))
        .with_runtime(Duration::from_secs(1800))
        .with_chapters(vec![
            ChapterInfo {
                name: "Intro".to_string(),
                start: Duration::ZERO,
            },
            ChapterInfo {
                name: "Main".to_string(),
                start: Duration::from_secs(60),
            },
        ])
}

/// What the server would hand back for `item`
pub fn resolved(item: BaseItem) -> PlaybackItem {
    let source = MediaSource {
        id: format!("{}-source", item.id),
        supports_direct_play: true,
        default_audio_stream_index: Some(1),
        default_subtitle_stream_index: Some(-1),
        ..Default::default()
    };
    let play_session_id = format!("{}-session", item.id);
    let url = format!("http://localhost:8096/Videos/{}/stream", item.id);
    PlaybackItem::new(item, source, play_session_id, url)
}

/// Factory resolving after `delay`
pub fn delayed_factory(delay: Duration) -> ItemFactory {
    item_factory(move |item| async move {
        tokio::time::sleep(delay).await;
        Ok(resolved(item))
    })
}

pub fn instant_factory() -> ItemFactory {
    item_factory(|item| async move { Ok(resolved(item)) })
}

pub fn provider(item: BaseItem) -> MediaPlayerItemProvider {
    MediaPlayerItemProvider::from_factory(item, instant_factory())
}

pub fn delayed_provider(item: BaseItem, delay: Duration) -> MediaPlayerItemProvider {
    MediaPlayerItemProvider::from_factory(item, delayed_factory(delay))
}

pub fn failing_provider(item: BaseItem) -> MediaPlayerItemProvider {
    MediaPlayerItemProvider::new(item, |item| async move {
        Err(PlaybackError::Resolution(format!(
            "transcode negotiation failed for {}",
            item.id
        )))
    })
}

/// Wait for an event matching `predicate`, discarding the others
pub async fn wait_for_event<F>(
    rx: &mut UnboundedReceiver<MediaPlayerEvent>,
    predicate: F,
    timeout_duration: Duration,
) -> Option<MediaPlayerEvent>
where
    F: Fn(&MediaPlayerEvent) -> bool,
{
    let deadline = Instant::now() + timeout_duration;

    while Instant::now() < deadline {
        match timeout(Duration::from_millis(100), rx.recv()).await {
            Ok(Some(event)) => {
                if predicate(&event) {
                    return Some(event);
                }
            }
            Ok(None) => break,
            Err(_) => continue,
        }
    }

    None
}

/// Drain whatever is already queued on `rx`
pub fn drain(rx: &mut UnboundedReceiver<MediaPlayerEvent>) -> Vec<MediaPlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Give spawned tasks a chance to run without moving the clock
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
