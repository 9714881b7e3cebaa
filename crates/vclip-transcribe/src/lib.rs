//! Lifecycle manager and JSON-over-stdio RPC client for the transcription sidecar.

pub mod error;
pub mod manager;
mod proc_util;
pub mod protocol;

pub use error::{TranscribeError, TranscribeResult};
pub use manager::{SidecarConfig, SidecarManager, SidecarState};
pub use protocol::{parse_line, SidecarMessage, TranscribeRequest};
