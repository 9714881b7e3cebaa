//! Newline-delimited JSON wire protocol spoken over the sidecar's stdin/stdout.

use serde::{Deserialize, Serialize};
use vclip_models::TranscriptionResult;

/// A request sent to the sidecar, one per line of stdin.
#[derive(Debug, Clone, Serialize)]
pub struct TranscribeRequest {
    pub id: String,
    pub op: &'static str,
    pub url: String,
}

impl TranscribeRequest {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            op: "transcribe",
            url: url.into(),
        }
    }
}

/// What the reader loop decided a line from the sidecar meant.
#[derive(Debug, Clone)]
pub enum SidecarMessage {
    /// The sidecar's one-time startup announcement.
    Ready,
    /// A response correlated to a request by `id`.
    Response {
        id: String,
        result: TranscriptionResult,
    },
    /// A line that didn't parse as a known message shape.
    Unrecognized(String),
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<vclip_models::Word>>,
    #[serde(default)]
    success: Option<bool>,
}

/// Parse one line of sidecar stdout into a [`SidecarMessage`].
pub fn parse_line(line: &str) -> SidecarMessage {
    let Ok(raw) = serde_json::from_str::<RawMessage>(line) else {
        return SidecarMessage::Unrecognized(line.to_string());
    };

    if raw.status.as_deref() == Some("ready") {
        return SidecarMessage::Ready;
    }

    match raw.id {
        Some(id) => SidecarMessage::Response {
            id,
            result: TranscriptionResult {
                text: raw.text.unwrap_or_default(),
                words: raw.words.unwrap_or_default(),
                success: raw.success.unwrap_or(false),
            },
        },
        None => SidecarMessage::Unrecognized(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ready_announcement() {
        let msg = parse_line(r#"{"status":"ready"}"#);
        assert!(matches!(msg, SidecarMessage::Ready));
    }

    #[test]
    fn parses_response_with_words() {
        let line = r#"{"id":"req-1","text":"hi there","words":[{"word":"hi","start":0.0,"end":0.2}],"success":true}"#;
        match parse_line(line) {
            SidecarMessage::Response { id, result } => {
                assert_eq!(id, "req-1");
                assert_eq!(result.text, "hi there");
                assert_eq!(result.words.len(), 1);
                assert!(result.success);
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_lines_are_unrecognized() {
        assert!(matches!(parse_line("not json"), SidecarMessage::Unrecognized(_)));
    }
}
