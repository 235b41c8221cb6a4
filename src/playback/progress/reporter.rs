use crate::jellyfin_client::PlaystateClient;
use crate::models::PlaystateInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, info, warn};

/// A telemetry call to the server
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackReport {
    Start(PlaystateInfo),
    Progress(PlaystateInfo),
    Stopped(PlaystateInfo),
}

impl PlaybackReport {
    pub fn info(&self) -> &PlaystateInfo {
        match self {
            PlaybackReport::Start(info)
            | PlaybackReport::Progress(info)
            | PlaybackReport::Stopped(info) => info,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PlaybackReport::Start(_) => "start",
            PlaybackReport::Progress(_) => "progress",
            PlaybackReport::Stopped(_) => "stopped",
        }
    }
}

/// Upper bound on a single report delivery
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget sender of playback reports
///
/// Reports are delivered one at a time, in the order they were sent, by a
/// background task. A failed or timed out delivery is logged and dropped; it
/// never reaches the caller and never holds up the reports behind it.
#[derive(Clone)]
pub struct PlaybackReporter {
    report_tx: tokio_mpsc::UnboundedSender<PlaybackReport>,
}

impl PlaybackReporter {
    pub fn start(client: Arc<dyn PlaystateClient>, runtime_handle: &tokio::runtime::Handle) -> Self {
        Self::start_with_timeout(client, DEFAULT_REPORT_TIMEOUT, runtime_handle)
    }

    pub fn start_with_timeout(
        client: Arc<dyn PlaystateClient>,
        report_timeout: Duration,
        runtime_handle: &tokio::runtime::Handle,
    ) -> Self {
        let (report_tx, mut report_rx) = tokio_mpsc::unbounded_channel::<PlaybackReport>();

        runtime_handle.spawn(async move {
            while let Some(report) = report_rx.recv().await {
                deliver(client.as_ref(), &report, report_timeout).await;
            }
            info!("Playback reporter channel closed, exiting");
        });

        Self { report_tx }
    }

    pub fn send(&self, report: PlaybackReport) {
        if self.report_tx.send(report).is_err() {
            warn!("Playback reporter is gone, dropping report");
        }
    }
}

async fn deliver(client: &dyn PlaystateClient, report: &PlaybackReport, report_timeout: Duration) {
    let send = async {
        match report {
            PlaybackReport::Start(info) => client.report_playback_start(info).await,
            PlaybackReport::Progress(info) => client.report_playback_progress(info).await,
            PlaybackReport::Stopped(info) => client.report_playback_stopped(info).await,
        }
    };

    let info = report.info();
    match tokio::time::timeout(report_timeout, send).await {
        Ok(Ok(())) => debug!(
            "Sent {} report for item {} at {} ticks",
            report.kind(),
            info.item_id,
            info.position_ticks
        ),
        Ok(Err(e)) => warn!(
            item_id = %info.item_id,
            play_session_id = %info.play_session_id,
            "Failed to send {} report: {}",
            report.kind(),
            e
        ),
        Err(_) => warn!(
            item_id = %info.item_id,
            play_session_id = %info.play_session_id,
            "Gave up on {} report after {:?}",
            report.kind(),
            report_timeout
        ),
    }
}
