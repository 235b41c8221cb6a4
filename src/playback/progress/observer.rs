use super::{PlaybackReporter, ProgressTracker, TrackerOutput};
use crate::playback::{
    MediaPlayerEvent, MediaPlayerManager, MediaPlayerState, PlaybackItem, PokeIntervalTimer,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sends start/progress/stopped reports for whatever a manager is playing
///
/// Subscribes to the manager's events and a [`PokeIntervalTimer`]; the timer is
/// poked on every item or play/pause change so periodic progress reports line
/// up with the last change. Stops itself once the manager stops or is dropped.
pub struct MediaProgressObserver {
    tracker: Arc<Mutex<ProgressTracker>>,
    task: JoinHandle<()>,
}

impl MediaProgressObserver {
    pub fn start(
        manager: &MediaPlayerManager,
        reporter: PlaybackReporter,
        runtime_handle: &tokio::runtime::Handle,
    ) -> Self {
        Self::start_with_interval(
            manager,
            reporter,
            manager.config().progress_interval,
            runtime_handle,
        )
    }

    pub fn start_with_interval(
        manager: &MediaPlayerManager,
        reporter: PlaybackReporter,
        interval: Duration,
        runtime_handle: &tokio::runtime::Handle,
    ) -> Self {
        let (events, snapshot) = manager.subscribe_with_snapshot();
        let mut tracker =
            ProgressTracker::new(snapshot.playback_request_status, snapshot.seconds);

        // Pick up an item assigned before we subscribed
        let mut initial =
            tracker.handle_event(&MediaPlayerEvent::PlaybackItemChanged(snapshot.playback_item));
        if snapshot.state == MediaPlayerState::Stopped {
            let output = tracker.handle_event(&MediaPlayerEvent::StateChanged(snapshot.state));
            initial.reports.extend(output.reports);
        }
        let finished = tracker.is_finished();
        let tracker = Arc::new(Mutex::new(tracker));

        let timer = PokeIntervalTimer::new(runtime_handle);
        let fired = timer.subscribe();

        info!("Progress observer attached to session {}", manager.id());
        let task = runtime_handle.spawn(run(
            events,
            fired,
            timer,
            interval,
            tracker.clone(),
            reporter,
            initial,
            finished,
        ));

        Self { tracker, task }
    }

    pub fn has_sent_start(&self) -> bool {
        self.tracker.lock().unwrap().has_sent_start()
    }

    pub fn tracked_item(&self) -> Option<Arc<PlaybackItem>> {
        self.tracker.lock().unwrap().item().cloned()
    }

    /// Whether the observer has sent its final report and stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MediaProgressObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut events: tokio_mpsc::UnboundedReceiver<MediaPlayerEvent>,
    mut fired: tokio_mpsc::UnboundedReceiver<()>,
    timer: PokeIntervalTimer,
    interval: Duration,
    tracker: Arc<Mutex<ProgressTracker>>,
    reporter: PlaybackReporter,
    initial: TrackerOutput,
    finished: bool,
) {
    dispatch(&reporter, initial);
    if finished {
        return;
    }
    timer.start(interval);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Manager dropped, closing out progress reports");
                    let output = tracker.lock().unwrap().finish();
                    dispatch(&reporter, output);
                    break;
                };

                let (output, finished) = {
                    let mut tracker = tracker.lock().unwrap();
                    let output = tracker.handle_event(&event);
                    (output, tracker.is_finished())
                };

                if output.poke {
                    timer.poke();
                }
                dispatch(&reporter, output);

                if finished {
                    break;
                }
            }
            Some(()) = fired.recv() => {
                let output = tracker.lock().unwrap().handle_timer();
                dispatch(&reporter, output);
            }
        }
    }

    timer.stop();
    info!("Progress observer finished");
}

fn dispatch(reporter: &PlaybackReporter, output: TrackerOutput) {
    for report in output.reports {
        reporter.send(report);
    }
}
