//! 刷卡处理流水线
//!
//! 扫描结果 → 广播 `scan` → 提交标签 API →
//! 成功：提示音 + 广播 `tag`；失败：入离线队列 + 错误提示音。
//! 提交在独立任务中进行，读卡事件循环不等待网络。

use std::sync::Arc;

use api_contract::{TagEventData, TagRequest, TagResponse, WsEventType};
use fm_card::{ReaderUpdate, ScanReport};
use fm_fanout::EventHub;
use fm_queue::{OfflineQueue, TagSubmitter};
use fm_telemetry::{record_tag_queued, record_tag_scanned, record_tag_submitted};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::feedback::FeedbackController;

#[derive(Clone)]
pub struct Agent {
    submitter: Arc<dyn TagSubmitter>,
    queue: Arc<Mutex<OfflineQueue>>,
    hub: Arc<EventHub>,
    feedback: FeedbackController,
}

impl Agent {
    pub fn new(
        submitter: Arc<dyn TagSubmitter>,
        queue: Arc<Mutex<OfflineQueue>>,
        hub: Arc<EventHub>,
        feedback: FeedbackController,
    ) -> Self {
        Self {
            submitter,
            queue,
            hub,
            feedback,
        }
    }

    pub fn handle_update(&self, update: ReaderUpdate) {
        match update {
            ReaderUpdate::Connected { reader_name } => self.hub.reader_connected(&reader_name),
            ReaderUpdate::Disconnected { reader_name } => {
                self.hub.reader_disconnected(&reader_name)
            }
            ReaderUpdate::CardRemoved => {}
            ReaderUpdate::Scanned(report) => {
                self.handle_scan(report);
            }
        }
    }

    /// 广播扫描结果后立即返回；提交结果由返回的任务给出（失败时为 `None`）。
    pub fn handle_scan(&self, report: ScanReport) -> JoinHandle<Option<TagResponse>> {
        record_tag_scanned();
        self.hub.broadcast(WsEventType::Scan, &report);

        let request = TagRequest {
            identifier: report.identifier().to_string(),
            aid: report.first_matched_aid().map(str::to_string),
        };
        info!(
            target: "fm.agent",
            identifier = %request.identifier,
            aid = request.aid.as_deref().unwrap_or("-"),
            card_type = %report.card_type,
            "tag_detected"
        );

        let agent = self.clone();
        tokio::spawn(async move { agent.submit_tag(request).await })
    }

    async fn submit_tag(&self, request: TagRequest) -> Option<TagResponse> {
        match self.submitter.submit(&request).await {
            Ok(response) => {
                record_tag_submitted();
                info!(
                    target: "fm.agent",
                    result = ?response.result,
                    space = %response.space_name,
                    message = %response.message,
                    "tag_submitted"
                );
                self.feedback.signal(Some(response.result));
                self.hub.broadcast(
                    WsEventType::Tag,
                    TagEventData {
                        request,
                        response: response.clone(),
                    },
                );
                Some(response)
            }
            Err(err) if err.is_permanent() => {
                // 后端拒收的请求重投也不会成功
                warn!(target: "fm.agent", identifier = %request.identifier, error = %err, "tag_rejected");
                self.feedback.signal(None);
                None
            }
            Err(err) => {
                warn!(target: "fm.agent", identifier = %request.identifier, error = %err, "tag_submit_failed");
                let pending = {
                    let mut queue = self.queue.lock().await;
                    if let Err(err) = queue.enqueue(request).await {
                        warn!(target: "fm.agent", error = %err, "queue_persist_failed");
                    }
                    queue.len()
                };
                record_tag_queued();
                info!(target: "fm.agent", pending, "tag_queued");
                self.feedback.signal(None);
                None
            }
        }
    }
}

/// 补发成功的标签照常广播 `tag`，不响提示音
pub fn broadcast_redelivered(hub: Arc<EventHub>) -> impl Fn(TagRequest, TagResponse) + Send + Sync + 'static {
    move |request, response| {
        hub.broadcast(WsEventType::Tag, TagEventData { request, response });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{Cue, CueSink, Tone};
    use async_trait::async_trait;
    use domain::TagResult;
    use fm_card::{AidScanResult, AidStatus};
    use fm_queue::SubmitError;
    use tokio::sync::Notify;

    struct FixedSubmitter(Option<TagResult>);

    fn response(result: TagResult) -> TagResponse {
        TagResponse {
            result,
            log_type: None,
            space_name: "Room 101".to_string(),
            user_name: None,
            control_result: None,
            control_summary: None,
            message: String::new(),
        }
    }

    #[async_trait]
    impl TagSubmitter for FixedSubmitter {
        async fn submit(&self, _request: &TagRequest) -> Result<TagResponse, SubmitError> {
            match self.0 {
                Some(result) => Ok(response(result)),
                None => Err(SubmitError::Transport("connection refused".to_string())),
            }
        }
    }

    /// 放行前一直挂起的提交器
    struct GatedSubmitter(Arc<Notify>);

    #[async_trait]
    impl TagSubmitter for GatedSubmitter {
        async fn submit(&self, _request: &TagRequest) -> Result<TagResponse, SubmitError> {
            self.0.notified().await;
            Ok(response(TagResult::Success))
        }
    }

    struct RejectingSubmitter;

    #[async_trait]
    impl TagSubmitter for RejectingSubmitter {
        async fn submit(&self, _request: &TagRequest) -> Result<TagResponse, SubmitError> {
            Err(SubmitError::Status(422))
        }
    }

    #[derive(Default)]
    struct Cues(std::sync::Mutex<Vec<Cue>>);

    impl CueSink for Cues {
        fn play(&self, cue: Cue) {
            self.0.lock().expect("cues").push(cue);
        }
    }

    fn report() -> ScanReport {
        ScanReport {
            uid: Some("04A1B2C3".to_string()),
            atr: "3B00".to_string(),
            card_type: "NFC Tag".to_string(),
            aid_results: vec![AidScanResult {
                aid: "F0010203040506".to_string(),
                label: "Android HCE Sample".to_string(),
                status: AidStatus::Success,
                sw: Some("9000".to_string()),
                response_data: None,
                app_data: None,
            }],
            matched_aids: vec!["F0010203040506".to_string()],
        }
    }

    async fn agent(
        dir: &tempfile::TempDir,
        result: Option<TagResult>,
    ) -> (Agent, Arc<Mutex<OfflineQueue>>, Arc<EventHub>, Arc<Cues>) {
        agent_with(dir, Arc::new(FixedSubmitter(result))).await
    }

    async fn agent_with(
        dir: &tempfile::TempDir,
        submitter: Arc<dyn TagSubmitter>,
    ) -> (Agent, Arc<Mutex<OfflineQueue>>, Arc<EventHub>, Arc<Cues>) {
        let queue = Arc::new(Mutex::new(
            OfflineQueue::open(dir.path().join("queue.json"), 10)
                .await
                .expect("queue"),
        ));
        let hub = Arc::new(EventHub::new());
        let cues = Arc::new(Cues::default());
        let agent = Agent::new(
            submitter,
            queue.clone(),
            hub.clone(),
            FeedbackController::with_sink(true, cues.clone()),
        );
        (agent, queue, hub, cues)
    }

    #[tokio::test]
    async fn submitted_tag_is_broadcast_and_cued() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (agent, queue, hub, cues) = agent(&dir, Some(TagResult::Success)).await;
        let mut events = hub.subscribe();

        let response = agent
            .handle_scan(report())
            .await
            .expect("join")
            .expect("response");

        assert_eq!(response.result, TagResult::Success);
        assert!(queue.lock().await.is_empty());
        let scan: serde_json::Value =
            serde_json::from_str(&events.recv().await.expect("scan")).expect("json");
        assert_eq!(scan["event"], "scan");
        let tag: serde_json::Value =
            serde_json::from_str(&events.recv().await.expect("tag")).expect("json");
        assert_eq!(tag["event"], "tag");
        assert_eq!(tag["data"]["request"]["aid"], "F0010203040506");
        assert_eq!(
            *cues.0.lock().expect("cues"),
            vec![Cue { tone: Tone::Short, repeat: 1 }]
        );
    }

    #[tokio::test]
    async fn failed_submission_queues_and_signals_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (agent, queue, _hub, cues) = agent(&dir, None).await;

        assert!(agent.handle_scan(report()).await.expect("join").is_none());

        let guard = queue.lock().await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard.front().expect("item").request.identifier, "04A1B2C3");
        assert_eq!(
            *cues.0.lock().expect("cues"),
            vec![Cue { tone: Tone::Long, repeat: 3 }]
        );
    }

    #[tokio::test]
    async fn reader_updates_drive_hub_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (agent, _queue, hub, _cues) = agent(&dir, Some(TagResult::Denied)).await;

        agent.handle_update(ReaderUpdate::Connected {
            reader_name: "ACS ACR122U".to_string(),
        });
        assert_eq!(hub.reader_name().as_deref(), Some("ACS ACR122U"));

        agent.handle_update(ReaderUpdate::Disconnected {
            reader_name: "ACS ACR122U".to_string(),
        });
        assert!(hub.reader_name().is_none());
    }

    #[tokio::test]
    async fn scan_is_broadcast_before_submission_completes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = Arc::new(Notify::new());
        let (agent, _queue, hub, cues) = agent_with(&dir, Arc::new(GatedSubmitter(gate.clone()))).await;
        let mut events = hub.subscribe();

        let pending = agent.handle_scan(report());

        let scan: serde_json::Value =
            serde_json::from_str(&events.recv().await.expect("scan")).expect("json");
        assert_eq!(scan["event"], "scan");
        // 后端未应答时读卡器状态照常推送
        agent.handle_update(ReaderUpdate::Connected {
            reader_name: "ACS ACR122U".to_string(),
        });
        assert_eq!(hub.reader_name().as_deref(), Some("ACS ACR122U"));
        assert!(!pending.is_finished());
        assert!(cues.0.lock().expect("cues").is_empty());

        gate.notify_one();
        let response = pending.await.expect("join").expect("response");
        assert_eq!(response.result, TagResult::Success);
    }

    #[tokio::test]
    async fn rejected_tag_is_not_queued() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (agent, queue, _hub, cues) = agent_with(&dir, Arc::new(RejectingSubmitter)).await;

        assert!(agent.handle_scan(report()).await.expect("join").is_none());

        assert!(queue.lock().await.is_empty());
        assert_eq!(
            *cues.0.lock().expect("cues"),
            vec![Cue { tone: Tone::Long, repeat: 3 }]
        );
    }
}
