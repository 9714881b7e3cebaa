//! Subtitle-specific validation, run before any ASS generation work begins.

use std::sync::OnceLock;

use regex::Regex;
use vclip_models::SubtitleSettings;

use crate::error::{SubtitlesError, SubtitlesResult};

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap())
}

pub fn validate_subtitle_settings(settings: &SubtitleSettings) -> SubtitlesResult<()> {
    if !(10..=200).contains(&settings.font_size) {
        return Err(SubtitlesError::InvalidSubtitleSettings(format!(
            "font_size {} out of range 10-200",
            settings.font_size
        )));
    }
    validate_hex_color(&settings.colors.word)?;
    validate_hex_color(&settings.colors.outline)?;
    if settings.font_family.trim().is_empty() {
        return Err(SubtitlesError::InvalidSubtitleSettings(
            "font_family must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_hex_color(color: &str) -> SubtitlesResult<()> {
    if hex_color_re().is_match(color) {
        Ok(())
    } else {
        Err(SubtitlesError::InvalidSubtitleSettings(format!(
            "'{color}' is not a #RRGGBB color"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::SubtitleColors;

    fn settings() -> SubtitleSettings {
        SubtitleSettings {
            colors: SubtitleColors {
                word: "#FFFFFF".to_string(),
                outline: "#000000".to_string(),
            },
            ..SubtitleSettings::default()
        }
    }

    #[test]
    fn accepts_default_settings() {
        assert!(validate_subtitle_settings(&settings()).is_ok());
    }

    #[test]
    fn rejects_font_size_out_of_range() {
        let mut s = settings();
        s.font_size = 500;
        assert!(validate_subtitle_settings(&s).is_err());
    }

    #[test]
    fn rejects_non_hex_color() {
        let mut s = settings();
        s.colors.word = "red".to_string();
        assert!(validate_subtitle_settings(&s).is_err());
    }
}
