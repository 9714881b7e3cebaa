//! Validation errors shared across the data model.

use thiserror::Error;

/// Errors raised while validating a submitted [`crate::project::VideoProject`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("project has no scenes")]
    NoScenes,

    #[error("scene {0} has no audio element")]
    MissingSceneAudio(usize),

    #[error("scene {0} has more than one audio element")]
    DuplicateSceneAudio(usize),

    #[error("project declares more than one background video element")]
    DuplicateBackgroundVideo,

    #[error("project declares more than one subtitles element")]
    DuplicateSubtitlesElement,

    #[error("invalid subtitle settings: {0}")]
    InvalidSubtitleSettings(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
