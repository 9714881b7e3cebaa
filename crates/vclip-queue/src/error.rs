//! Queue error types.

use thiserror::Error;
use vclip_models::ValidationError;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full")]
    QueueFull,

    #[error("invalid submission: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("invalid state transition: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
