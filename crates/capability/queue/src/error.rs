#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue encode error: {0}")]
    Serde(#[from] serde_json::Error),
}
