//! The declarative project description submitted by a client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output quality preset, forwarded to the FFmpeg command composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

/// Where progressive/classic subtitle events are anchored on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePosition {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Word-by-word reveal vs. one subtitle line per scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleStyle {
    #[default]
    Progressive,
    Classic,
}

/// Hex color pair used when rendering subtitle text and its outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleColors {
    pub word: String,
    pub outline: String,
}

impl Default for SubtitleColors {
    fn default() -> Self {
        Self {
            word: "#FFFFFF".to_string(),
            outline: "#000000".to_string(),
        }
    }
}

/// Subtitle rendering configuration, supplied as a `subtitles` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub style: SubtitleStyle,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default)]
    pub colors: SubtitleColors,
}

fn default_true() -> bool {
    true
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    48
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            style: SubtitleStyle::default(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            position: SubtitlePosition::default(),
            colors: SubtitleColors::default(),
        }
    }
}

/// A single timeline element, tagged by `type`. The same shape is used both at the
/// project level (global elements) and inside a scene (scene elements) — a scene is
/// only required to contain `Audio`, but the model doesn't forbid the others from
/// appearing there too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Background video, looped/truncated to the composed duration.
    Video { src: String },
    /// A scene's anchoring audio track.
    Audio { src: String },
    /// A still image overlay, visible for the scene's window.
    Image {
        src: String,
        x: i32,
        y: i32,
        #[serde(default)]
        z_index: i32,
    },
    /// Subtitle rendering configuration.
    Subtitles { settings: SubtitleSettings },
}

impl Element {
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Video { .. } => "video",
            Element::Audio { .. } => "audio",
            Element::Image { .. } => "image",
            Element::Subtitles { .. } => "subtitles",
        }
    }
}

/// An ordered list of elements anchored by exactly one [`Element::Audio`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Scene {
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn audio(&self) -> Option<&Element> {
        self.elements.iter().find(|e| matches!(e, Element::Audio { .. }))
    }

    pub fn audio_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, Element::Audio { .. }))
            .count()
    }
}

/// The top-level declarative description submitted for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoProject {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub elements: Vec<Element>,
    pub scenes: Vec<Scene>,
}

impl VideoProject {
    pub fn background_video(&self) -> Option<&Element> {
        self.elements.iter().find(|e| matches!(e, Element::Video { .. }))
    }

    pub fn subtitle_settings(&self) -> Option<&SubtitleSettings> {
        self.elements.iter().find_map(|e| match e {
            Element::Subtitles { settings } => Some(settings),
            _ => None,
        })
    }
}
