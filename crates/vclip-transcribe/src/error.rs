//! Errors raised by the transcription sidecar manager.

use thiserror::Error;

pub type TranscribeResult<T> = Result<T, TranscribeError>;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription sidecar binary not found in PATH")]
    SidecarNotFound,

    #[error("sidecar did not report ready within {0:?}")]
    StartupTimeout(std::time::Duration),

    #[error("transcription request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),

    #[error("sidecar process crashed: {0}")]
    SidecarCrashed(String),

    #[error("sidecar exhausted its restart budget and is unhealthy")]
    SidecarUnhealthy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TranscribeError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
