use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use api_contract::{TagRequest, TagResponse};
use async_trait::async_trait;
use domain::TagResult;
use fm_queue::{OfflineQueue, RetryPolicy, SubmitError, TagSubmitter, drain_once};
use tokio::sync::Mutex;

/// 按顺序给出结果的提交器
struct ScriptedSubmitter {
    replies: std::sync::Mutex<VecDeque<Result<TagResult, SubmitError>>>,
    seen: std::sync::Mutex<Vec<String>>,
}

impl ScriptedSubmitter {
    fn new(replies: Vec<Result<TagResult, SubmitError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TagSubmitter for ScriptedSubmitter {
    async fn submit(&self, request: &TagRequest) -> Result<TagResponse, SubmitError> {
        self.seen
            .lock()
            .expect("seen lock")
            .push(request.identifier.clone());
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or(Err(SubmitError::Transport("offline".to_string())))?;
        Ok(TagResponse {
            result: reply,
            log_type: None,
            space_name: String::new(),
            user_name: None,
            control_result: None,
            control_summary: None,
            message: String::new(),
        })
    }
}

async fn queue_with(dir: &tempfile::TempDir, ids: &[&str]) -> Mutex<OfflineQueue> {
    let mut queue = OfflineQueue::open(dir.path().join("queue.json"), 10)
        .await
        .expect("open");
    for id in ids {
        queue
            .enqueue(TagRequest {
                identifier: id.to_string(),
                aid: None,
            })
            .await
            .expect("enqueue");
    }
    Mutex::new(queue)
}

#[tokio::test]
async fn drain_delivers_until_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = queue_with(&dir, &["a", "b"]).await;
    let submitter = ScriptedSubmitter::new(vec![Ok(TagResult::Success), Ok(TagResult::Denied)]);

    let outcome = drain_once(&queue, &submitter).await;

    assert!(!outcome.failed);
    assert_eq!(outcome.delivered.len(), 2);
    // DENIED 也算送达
    assert_eq!(outcome.delivered[1].1.result, TagResult::Denied);
    assert!(queue.lock().await.is_empty());
}

#[tokio::test]
async fn drain_stops_at_first_failure_and_counts_retry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = queue_with(&dir, &["a", "b", "c"]).await;
    let submitter = ScriptedSubmitter::new(vec![
        Ok(TagResult::Success),
        Err(SubmitError::Timeout("10s".to_string())),
    ]);

    let outcome = drain_once(&queue, &submitter).await;

    assert!(outcome.failed);
    assert_eq!(outcome.delivered.len(), 1);
    assert_eq!(*submitter.seen.lock().expect("seen"), vec!["a", "b"]);
    let guard = queue.lock().await;
    assert_eq!(guard.len(), 2);
    let head = guard.front().expect("head");
    assert_eq!(head.request.identifier, "b");
    assert_eq!(head.retry_count, 1);
}

#[tokio::test]
async fn drain_drops_rejected_item_and_keeps_going() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = queue_with(&dir, &["bad", "good1", "good2"]).await;
    let submitter = ScriptedSubmitter::new(vec![
        Err(SubmitError::Status(400)),
        Ok(TagResult::Success),
        Ok(TagResult::Success),
    ]);

    let outcome = drain_once(&queue, &submitter).await;

    assert!(!outcome.failed);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].identifier, "bad");
    assert_eq!(outcome.delivered.len(), 2);
    assert!(queue.lock().await.is_empty());

    // 落盘结果同样不含被拒条目
    let reopened = OfflineQueue::open(dir.path().join("queue.json"), 10)
        .await
        .expect("reopen");
    assert!(reopened.is_empty());
}

#[tokio::test]
async fn drain_keeps_item_on_retryable_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = queue_with(&dir, &["a", "b"]).await;
    let submitter = ScriptedSubmitter::new(vec![Err(SubmitError::Status(429))]);

    let outcome = drain_once(&queue, &submitter).await;

    assert!(outcome.failed);
    assert!(outcome.rejected.is_empty());
    let guard = queue.lock().await;
    assert_eq!(guard.len(), 2);
    assert_eq!(guard.front().expect("head").retry_count, 1);
}

#[test]
fn permanent_statuses_are_4xx_except_auth_timeout_and_throttle() {
    for code in [400u16, 404, 409, 422] {
        assert!(SubmitError::Status(code).is_permanent(), "{code}");
    }
    for code in [401u16, 408, 429, 500, 503] {
        assert!(!SubmitError::Status(code).is_permanent(), "{code}");
    }
    assert!(!SubmitError::Timeout("10s".to_string()).is_permanent());
    assert!(!SubmitError::Decode("eof".to_string()).is_permanent());
}

#[tokio::test]
async fn drain_on_empty_queue_is_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = queue_with(&dir, &[]).await;
    let submitter = ScriptedSubmitter::new(Vec::new());

    let outcome = drain_once(&queue, &submitter).await;

    assert!(!outcome.failed);
    assert!(outcome.delivered.is_empty());
    assert!(submitter.seen.lock().expect("seen").is_empty());
}

#[tokio::test]
async fn drain_task_redelivers_in_background() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = Arc::new(queue_with(&dir, &["a"]).await);
    let submitter = Arc::new(ScriptedSubmitter::new(vec![Ok(TagResult::Success)]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = fm_queue::spawn_drain_task(
        queue.clone(),
        submitter,
        RetryPolicy::new(Duration::from_millis(10)),
        move |request, _response| {
            let _ = tx.send(request.identifier);
        },
    );

    let delivered = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delivered in time");
    handle.abort();
    assert_eq!(delivered.as_deref(), Some("a"));
    assert!(queue.lock().await.is_empty());
}

#[test]
fn backoff_doubles_up_to_cap() {
    let policy = RetryPolicy::new(Duration::from_secs(5));

    assert_eq!(policy.delay_after(0), Duration::from_secs(5));
    assert_eq!(policy.delay_after(1), Duration::from_secs(10));
    assert_eq!(policy.delay_after(4), Duration::from_secs(80));
    assert_eq!(policy.delay_after(9), Duration::from_secs(80));
    assert_eq!(policy.delay_after(64), Duration::from_secs(80));
}
