//! Scene-timeline construction and ASS subtitle event generation.

pub mod ass;
pub mod error;
pub mod timing;
pub mod validate;

pub use ass::{build_scene_events, render_document, write_ass_file};
pub use error::{SubtitlesError, SubtitlesResult};
pub use timing::build_timeline;
pub use validate::validate_subtitle_settings;
