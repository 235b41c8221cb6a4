mod support;
use std::sync::Arc;
use std::time::Duration;

use crate::support::*;
use jellyplay::jellyfin_client::PlaystateClient;
use jellyplay::models::{duration_to_ticks, PlaystateInfo};
use jellyplay::playback::{
    ListQueue, MediaPlayerAction, MediaPlayerEvent, MediaPlayerItemProvider, MediaPlayerManager,
    MediaPlayerState, MediaProgressObserver, PlaybackReport, PlaybackReporter,
    PlaybackRequestStatus,
};
use tokio::sync::mpsc::UnboundedReceiver;

const INTERVAL: Duration = Duration::from_secs(5);

/// Manager, observer and reporter wired to an in-memory playstate client
struct ReportingFixture {
    manager: Arc<MediaPlayerManager>,
    observer: MediaProgressObserver,
    client: Arc<MockPlaystateClient>,
    events: UnboundedReceiver<MediaPlayerEvent>,
}

impl ReportingFixture {
    fn new(manager: Arc<MediaPlayerManager>, client: MockPlaystateClient) -> Self {
        tracing_init();

        let runtime_handle = tokio::runtime::Handle::current();
        let client = Arc::new(client);
        let playstate: Arc<dyn PlaystateClient> = client.clone();
        let reporter = PlaybackReporter::start(playstate, &runtime_handle);
        let observer =
            MediaProgressObserver::start_with_interval(&manager, reporter, INTERVAL, &runtime_handle);
        let events = manager.subscribe();

        Self {
            manager,
            observer,
            client,
            events,
        }
    }

    fn with_provider(provider: MediaPlayerItemProvider) -> Self {
        Self::new(
            MediaPlayerManager::builder(tokio::runtime::Handle::current())
                .provider(provider)
                .build(),
            MockPlaystateClient::new(),
        )
    }

    async fn wait_for_playback(&mut self) {
        let event = wait_for_event(
            &mut self.events,
            |event| matches!(event, MediaPlayerEvent::StateChanged(MediaPlayerState::Playback)),
            Duration::from_secs(30),
        )
        .await;
        assert!(event.is_some(), "manager never reached playback");
    }

    /// Poll until at least `count` reports were delivered, without reaching the next interval
    async fn wait_for_calls(&self, count: usize) -> Vec<ReportCall> {
        for _ in 0..100 {
            if self.client.calls().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.client.calls()
    }
}

fn start(id: &str) -> ReportCall {
    ReportCall::Start(id.to_string())
}

fn stopped(id: &str) -> ReportCall {
    ReportCall::Stopped(id.to_string())
}

fn progress(id: &str, is_paused: bool) -> ReportCall {
    ReportCall::Progress {
        item_id: id.to_string(),
        is_paused,
    }
}

#[tokio::test(start_paused = true)]
async fn test_item_swap_then_stop_reports_in_order() {
    let mut fixture = ReportingFixture::with_provider(provider(movie("a")));

    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    fixture
        .manager
        .send(MediaPlayerAction::PlayNewItem(provider(movie("b"))));
    fixture.wait_for_playback().await;
    fixture.manager.send(MediaPlayerAction::Stop);

    let calls = fixture.wait_for_calls(4).await;
    assert_eq!(calls, vec![start("a"), stopped("a"), start("b"), stopped("b")]);

    settle().await;
    assert!(fixture.observer.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_start_report_carries_session_and_resume_point() {
    let item = movie("a").with_resume_position(Duration::from_secs(75));
    let mut fixture = ReportingFixture::with_provider(provider(item));

    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    fixture.wait_for_calls(1).await;

    let info = &fixture.client.infos()[0];
    assert_eq!(info.item_id, "a");
    assert_eq!(info.media_source_id, "a-source");
    assert_eq!(info.play_session_id, "a-session");
    assert_eq!(info.position_ticks, duration_to_ticks(Duration::from_secs(75)));
    assert_eq!(info.audio_stream_index, Some(1));
    assert!(!info.is_paused);
    assert!(fixture.observer.has_sent_start());
}

#[tokio::test(start_paused = true)]
async fn test_interval_sends_progress_with_current_position() {
    let mut fixture = ReportingFixture::with_provider(provider(movie("a")));
    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    fixture.wait_for_calls(1).await;

    fixture.manager.set_seconds(Duration::from_secs(3));
    tokio::time::sleep(INTERVAL).await;

    let calls = fixture.wait_for_calls(2).await;
    assert_eq!(calls, vec![start("a"), progress("a", false)]);
    assert_eq!(
        fixture.client.infos()[1].position_ticks,
        duration_to_ticks(Duration::from_secs(3))
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_reports_immediately_and_keeps_reporting_paused() {
    let mut fixture = ReportingFixture::with_provider(provider(movie("a")));
    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    fixture.wait_for_calls(1).await;

    fixture.manager.send(MediaPlayerAction::SetPlaybackRequestStatus(
        PlaybackRequestStatus::Paused,
    ));
    let calls = fixture.wait_for_calls(2).await;
    assert_eq!(calls, vec![start("a"), progress("a", true)]);

    tokio::time::sleep(INTERVAL).await;
    let calls = fixture.wait_for_calls(3).await;
    assert_eq!(calls[2], progress("a", true));
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_resets_start_for_next_item() {
    let queue = Arc::new(ListQueue::new(
        "Season 1",
        vec![movie("a"), movie("b")],
        delayed_factory(Duration::from_secs(1)),
    ));
    let manager = MediaPlayerManager::builder(tokio::runtime::Handle::current())
        .playback_item(resolved(movie("a")))
        .queue(queue)
        .build();
    let mut fixture = ReportingFixture::new(manager, MockPlaystateClient::new());
    fixture.wait_for_calls(1).await;
    assert!(fixture.observer.has_sent_start());

    fixture.manager.set_seconds(Duration::from_millis(3_599_200));
    fixture.manager.send(MediaPlayerAction::Ended);
    assert_eq!(fixture.manager.state(), MediaPlayerState::LoadingItem);

    let calls = fixture.wait_for_calls(2).await;
    assert_eq!(calls, vec![start("a"), stopped("a")]);
    assert!(!fixture.observer.has_sent_start());
    assert!(fixture.observer.tracked_item().is_none());

    fixture.wait_for_playback().await;
    let calls = fixture.wait_for_calls(3).await;
    assert_eq!(calls[2], start("b"));
    assert_eq!(
        fixture
            .observer
            .tracked_item()
            .map(|item| item.base_item.id.clone()),
        Some("b".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_resolution_sends_nothing() {
    let mut fixture = ReportingFixture::with_provider(failing_provider(movie("a")));

    fixture.manager.send(MediaPlayerAction::Start);
    let errored = wait_for_event(
        &mut fixture.events,
        |event| matches!(event, MediaPlayerEvent::StateChanged(MediaPlayerState::Error(_))),
        Duration::from_secs(30),
    )
    .await;
    assert!(errored.is_some());

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(fixture.client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_server_failures_do_not_touch_playback() {
    let manager = MediaPlayerManager::builder(tokio::runtime::Handle::current())
        .provider(provider(movie("a")))
        .build();
    let mut fixture = ReportingFixture::new(manager, MockPlaystateClient::failing());

    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    tokio::time::sleep(INTERVAL).await;

    let calls = fixture.wait_for_calls(2).await;
    assert_eq!(calls, vec![start("a"), progress("a", false)]);
    assert_eq!(fixture.manager.state(), MediaPlayerState::Playback);
    assert!(fixture.observer.has_sent_start());
}

#[tokio::test(start_paused = true)]
async fn test_observer_picks_up_item_assigned_before_it_started() {
    let manager = MediaPlayerManager::builder(tokio::runtime::Handle::current())
        .playback_item(resolved(movie("a")))
        .build();
    let fixture = ReportingFixture::new(manager, MockPlaystateClient::new());

    let calls = fixture.wait_for_calls(1).await;
    assert_eq!(calls, vec![start("a")]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_manager_closes_out_item() {
    let manager = MediaPlayerManager::builder(tokio::runtime::Handle::current())
        .playback_item(resolved(movie("a")))
        .build();
    let fixture = ReportingFixture::new(manager, MockPlaystateClient::new());
    fixture.wait_for_calls(1).await;

    let ReportingFixture {
        manager,
        observer,
        client,
        ..
    } = fixture;
    drop(manager);

    for _ in 0..100 {
        if client.calls().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.calls(), vec![start("a"), stopped("a")]);
    assert!(observer.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_pause_restarts_report_countdown() {
    let mut fixture = ReportingFixture::with_provider(provider(movie("a")));
    fixture.manager.send(MediaPlayerAction::Start);
    fixture.wait_for_playback().await;
    fixture.wait_for_calls(1).await;
    let assigned_at = tokio::time::Instant::now();

    // Pause one second before the first periodic report is due
    tokio::time::sleep_until(assigned_at + Duration::from_secs(4)).await;
    fixture.manager.send(MediaPlayerAction::SetPlaybackRequestStatus(
        PlaybackRequestStatus::Paused,
    ));
    let calls = fixture.wait_for_calls(2).await;
    assert_eq!(calls, vec![start("a"), progress("a", true)]);

    // The countdown restarted at the pause, so nothing is due at the old deadline
    tokio::time::sleep_until(assigned_at + Duration::from_millis(6500)).await;
    assert_eq!(fixture.client.calls().len(), 2);

    tokio::time::sleep_until(assigned_at + Duration::from_millis(9500)).await;
    let calls = fixture.wait_for_calls(3).await;
    assert_eq!(calls, vec![start("a"), progress("a", true), progress("a", true)]);
}

fn report_info(id: &str) -> PlaystateInfo {
    PlaystateInfo {
        item_id: id.to_string(),
        media_source_id: format!("{}-source", id),
        play_session_id: format!("{}-session", id),
        position_ticks: 0,
        is_paused: false,
        audio_stream_index: None,
        subtitle_stream_index: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_report_does_not_hold_up_later_ones() {
    tracing_init();
    let client = Arc::new(MockPlaystateClient::stalling_first());
    let playstate: Arc<dyn PlaystateClient> = client.clone();
    let reporter = PlaybackReporter::start_with_timeout(
        playstate,
        Duration::from_secs(2),
        &tokio::runtime::Handle::current(),
    );

    reporter.send(PlaybackReport::Start(report_info("a")));
    reporter.send(PlaybackReport::Stopped(report_info("a")));
    reporter.send(PlaybackReport::Start(report_info("b")));
    reporter.send(PlaybackReport::Stopped(report_info("b")));

    tokio::time::sleep(Duration::from_secs(3)).await;
    settle().await;

    assert_eq!(
        client.calls(),
        vec![start("a"), stopped("a"), start("b"), stopped("b")]
    );
}

/// Every start is closed by a stop before the same item starts again
fn assert_starts_are_paired(calls: &[ReportCall]) {
    let mut open = std::collections::HashSet::new();
    for call in calls {
        match call {
            ReportCall::Start(id) => {
                assert!(open.insert(id.clone()), "start({}) sent twice: {:?}", id, calls)
            }
            ReportCall::Stopped(id) => {
                open.remove(id);
            }
            ReportCall::Progress { .. } => {}
        }
    }
    assert!(open.is_empty(), "unclosed starts {:?} in {:?}", open, calls);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_observer_attached_during_item_swaps_never_repeats_start() {
    tracing_init();
    let runtime_handle = tokio::runtime::Handle::current();

    for _ in 0..20 {
        let manager = MediaPlayerManager::builder(runtime_handle.clone())
            .playback_item(resolved(movie("a")))
            .build();

        let swapper = {
            let manager = manager.clone();
            tokio::task::spawn_blocking(move || {
                for i in 0..50 {
                    manager.send(MediaPlayerAction::PlayNewItem(provider(movie(&format!(
                        "m{}",
                        i
                    )))));
                }
            })
        };

        let client = Arc::new(MockPlaystateClient::new());
        let playstate: Arc<dyn PlaystateClient> = client.clone();
        let reporter = PlaybackReporter::start(playstate, &runtime_handle);
        let observer =
            MediaProgressObserver::start_with_interval(&manager, reporter, INTERVAL, &runtime_handle);

        swapper.await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.send(MediaPlayerAction::Stop);

        for _ in 0..500 {
            if observer.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(observer.is_finished());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_starts_are_paired(&client.calls());
    }
}
