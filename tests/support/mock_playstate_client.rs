use jellyplay::jellyfin_client::{ClientError, PlaystateClient};
use jellyplay::models::PlaystateInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A recorded telemetry call
#[derive(Debug, Clone, PartialEq)]
pub enum ReportCall {
    Start(String),
    Progress { item_id: String, is_paused: bool },
    Stopped(String),
}

/// Playstate client that records reports in memory
///
/// With `failing` set every call is recorded and then rejected, like a server
/// that is down. With `stalling_first` the first call is recorded and then
/// never answers, like a dead connection.
#[derive(Default)]
pub struct MockPlaystateClient {
    calls: Mutex<Vec<ReportCall>>,
    infos: Mutex<Vec<PlaystateInfo>>,
    failing: AtomicBool,
    stall_next: AtomicBool,
}

impl MockPlaystateClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let client = Self::default();
        client.failing.store(true, Ordering::SeqCst);
        client
    }

    pub fn stalling_first() -> Self {
        let client = Self::default();
        client.stall_next.store(true, Ordering::SeqCst);
        client
    }

    pub fn calls(&self) -> Vec<ReportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<PlaystateInfo> {
        self.infos.lock().unwrap().clone()
    }

    async fn record(&self, call: ReportCall, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call);
        self.infos.lock().unwrap().push(info.clone());
        if self.stall_next.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Status(503));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlaystateClient for MockPlaystateClient {
    async fn report_playback_start(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.record(ReportCall::Start(info.item_id.clone()), info)
            .await
    }

    async fn report_playback_progress(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.record(
            ReportCall::Progress {
                item_id: info.item_id.clone(),
                is_paused: info.is_paused,
            },
            info,
        )
        .await
    }

    async fn report_playback_stopped(&self, info: &PlaystateInfo) -> Result<(), ClientError> {
        self.record(ReportCall::Stopped(info.item_id.clone()), info)
            .await
    }
}
