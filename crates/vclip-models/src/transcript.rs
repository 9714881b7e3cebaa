//! Result types returned by the transcription sidecar.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single recognized word with its timing relative to the start of the audio clip
/// it was transcribed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// The sidecar's response to a transcription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptionResult {
    pub text: String,
    pub words: Vec<Word>,
    pub success: bool,
}

impl TranscriptionResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            words: Vec::new(),
            success: false,
        }
    }
}
