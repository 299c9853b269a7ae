use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing, expired, or rejected credentials. Handled centrally: the
    /// session is cleared and the caller must sign in again.
    #[error("unauthorized")]
    Unauthorized,
    /// Benign on mutations (e.g. deleting an already-deleted task); callers
    /// refresh rather than report.
    #[error("not found")]
    NotFound,
    #[error("backend returned status {0}")]
    UnexpectedStatus(u16),
    #[error("transport: {0}")]
    Transport(String),
    #[error("realtime channel: {0}")]
    Channel(String),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session store: {0}")]
    Session(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Session(err.to_string())
    }
}
