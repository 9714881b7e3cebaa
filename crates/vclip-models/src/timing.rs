//! Per-scene timing windows on the composed output's timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The window `[start_seconds, end_seconds)` during which a scene's audio (and its
/// subtitle events) are active on the composed output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimingSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub audio_url: String,
}

impl TimingSegment {
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}
