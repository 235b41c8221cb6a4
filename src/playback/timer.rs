use crate::playback::EventHandle;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::time::Instant;
use tracing::{trace, warn};

#[derive(Debug)]
enum TimerControl {
    Start(Duration),
    Poke,
    Pause,
    Stop,
}

/// Repeating timer whose countdown restarts on activity
///
/// `start` arms it with an interval; every elapsed interval publishes a fired
/// event to subscribers and re-arms. `poke` restarts the countdown from now,
/// and also resumes a paused timer. `pause` halts firing but keeps the
/// interval; `stop` forgets it, so only `start` brings the timer back.
///
/// A zero interval is ignored. The timer task ends when the timer is dropped.
pub struct PokeIntervalTimer {
    control_tx: tokio_mpsc::UnboundedSender<TimerControl>,
    fired: EventHandle<()>,
}

impl PokeIntervalTimer {
    pub fn new(runtime_handle: &tokio::runtime::Handle) -> Self {
        let (control_tx, control_rx) = tokio_mpsc::unbounded_channel();
        let fired = EventHandle::new();

        runtime_handle.spawn(run(control_rx, fired.clone()));

        Self { control_tx, fired }
    }

    /// Receiver of fired events
    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<()> {
        self.fired.subscribe()
    }

    pub fn start(&self, interval: Duration) {
        let _ = self.control_tx.send(TimerControl::Start(interval));
    }

    pub fn poke(&self) {
        let _ = self.control_tx.send(TimerControl::Poke);
    }

    pub fn pause(&self) {
        let _ = self.control_tx.send(TimerControl::Pause);
    }

    pub fn stop(&self) {
        let _ = self.control_tx.send(TimerControl::Stop);
    }
}

async fn run(mut control_rx: tokio_mpsc::UnboundedReceiver<TimerControl>, fired: EventHandle<()>) {
    let mut interval: Option<Duration> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            control = control_rx.recv() => {
                let Some(control) = control else {
                    break;
                };
                trace!("Timer control: {:?}", control);
                match control {
                    TimerControl::Start(new_interval) if new_interval.is_zero() => {
                        warn!("Ignoring timer start with a zero interval");
                    }
                    TimerControl::Start(new_interval) => {
                        interval = Some(new_interval);
                        deadline = Some(Instant::now() + new_interval);
                    }
                    TimerControl::Poke => {
                        deadline = interval.map(|interval| Instant::now() + interval);
                    }
                    TimerControl::Pause => {
                        deadline = None;
                    }
                    TimerControl::Stop => {
                        interval = None;
                        deadline = None;
                    }
                }
            }
            _ = wait_until(deadline) => {
                fired.publish(());
                deadline = interval.map(|interval| Instant::now() + interval);
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
