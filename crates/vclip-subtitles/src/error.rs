//! Errors raised while building the subtitle timeline and emitting ASS files.

use thiserror::Error;

pub type SubtitlesResult<T> = Result<T, SubtitlesError>;

#[derive(Debug, Error)]
pub enum SubtitlesError {
    #[error("invalid subtitle settings: {0}")]
    InvalidSubtitleSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SubtitlesError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<vclip_models::ValidationError> for SubtitlesError {
    fn from(err: vclip_models::ValidationError) -> Self {
        SubtitlesError::InvalidSubtitleSettings(err.to_string())
    }
}
