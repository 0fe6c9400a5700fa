use thiserror::Error;

/// Failures reported by the engine and its collaborators. Everything here
/// is report-and-continue at the call sites that can tolerate it; nothing
/// is retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown event kind {0:?}")]
    UnknownEventKind(String),

    #[error("lap index {index} out of range (have {len} laps)")]
    LapIndexOutOfRange { index: usize, len: usize },

    #[error("state store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("state store encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("fetch failed for {path}: {reason}")]
    Fetch { path: String, reason: String },
}
