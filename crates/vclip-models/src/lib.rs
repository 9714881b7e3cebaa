//! Shared data model for the video-composition pipeline.
//!
//! This crate has no I/O: it defines the wire/domain types passed between the
//! registry, worker pool, media, transcription, and subtitle crates, plus the
//! structural validation rules a submitted project must satisfy.

pub mod error;
pub mod ids;
pub mod job;
pub mod project;
pub mod subtitle;
pub mod timing;
pub mod transcript;
pub mod validation;

pub use error::ValidationError;
pub use ids::{JobId, VideoId};
pub use job::{Job, JobStatus};
pub use project::{
    Element, Quality, Scene, SubtitleColors, SubtitlePosition, SubtitleSettings, SubtitleStyle,
    VideoProject,
};
pub use subtitle::AssEvent;
pub use timing::TimingSegment;
pub use transcript::{TranscriptionResult, Word};
pub use validation::validate_project;
