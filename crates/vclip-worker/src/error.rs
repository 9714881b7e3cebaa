//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] vclip_models::ValidationError),

    #[error("media error: {0}")]
    Media(#[from] vclip_media::MediaError),

    #[error("transcription error: {0}")]
    Transcribe(#[from] vclip_transcribe::TranscribeError),

    #[error("subtitles error: {0}")]
    Subtitles(#[from] vclip_subtitles::SubtitlesError),

    #[error("queue error: {0}")]
    Queue(#[from] vclip_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the job pipeline should be cancelled rather than reported as a
    /// normal failure (cancellation is surfaced to callers via the render error
    /// path, not retried).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(vclip_media::MediaError::Cancelled))
    }
}
