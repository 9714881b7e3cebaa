//! ASS subtitle event model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One timed ASS dialogue event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub style: String,
}
