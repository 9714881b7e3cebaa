//! Structural validation of a submitted [`crate::project::VideoProject`].

use crate::error::ValidationError;
use crate::project::{Element, VideoProject};

/// Enforces I1-I5: at least one scene, each scene anchored by exactly one audio
/// element, at most one background video element, at most one subtitles element.
pub fn validate_project(project: &VideoProject) -> Result<(), ValidationError> {
    if project.scenes.is_empty() {
        return Err(ValidationError::NoScenes);
    }

    let video_count = project
        .elements
        .iter()
        .filter(|e| matches!(e, Element::Video { .. }))
        .count();
    if video_count > 1 {
        return Err(ValidationError::DuplicateBackgroundVideo);
    }

    let subtitles_count = project
        .elements
        .iter()
        .filter(|e| matches!(e, Element::Subtitles { .. }))
        .count();
    if subtitles_count > 1 {
        return Err(ValidationError::DuplicateSubtitlesElement);
    }

    for (idx, scene) in project.scenes.iter().enumerate() {
        match scene.audio_count() {
            0 => return Err(ValidationError::MissingSceneAudio(idx)),
            1 => {}
            _ => return Err(ValidationError::DuplicateSceneAudio(idx)),
        }
    }

    if let Some(settings) = project.subtitle_settings() {
        validate_subtitle_font_size(settings.font_size)?;
        validate_hex_color(&settings.colors.word)?;
        validate_hex_color(&settings.colors.outline)?;
    }

    Ok(())
}

fn validate_subtitle_font_size(size: u32) -> Result<(), ValidationError> {
    if (10..=200).contains(&size) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSubtitleSettings(format!(
            "font_size {size} out of range 10-200"
        )))
    }
}

fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidSubtitleSettings(format!(
            "'{color}' is not a #RRGGBB color"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Scene, SubtitleColors, SubtitleSettings};

    fn scene_with_audio() -> Scene {
        Scene {
            elements: vec![Element::Audio {
                src: "https://example.com/a.mp3".to_string(),
            }],
        }
    }

    #[test]
    fn rejects_empty_project() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: Vec::new(),
        };
        assert_eq!(validate_project(&project), Err(ValidationError::NoScenes));
    }

    #[test]
    fn rejects_scene_without_audio() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![Scene::default()],
        };
        assert_eq!(
            validate_project(&project),
            Err(ValidationError::MissingSceneAudio(0))
        );
    }

    #[test]
    fn rejects_duplicate_background_video() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: vec![
                Element::Video {
                    src: "a.mp4".to_string(),
                },
                Element::Video {
                    src: "b.mp4".to_string(),
                },
            ],
            scenes: vec![scene_with_audio()],
        };
        assert_eq!(
            validate_project(&project),
            Err(ValidationError::DuplicateBackgroundVideo)
        );
    }

    #[test]
    fn accepts_well_formed_project() {
        let project = VideoProject {
            width: Some(1080),
            height: Some(1920),
            quality: None,
            elements: vec![Element::Subtitles {
                settings: SubtitleSettings {
                    colors: SubtitleColors {
                        word: "#FFFFFF".to_string(),
                        outline: "#000000".to_string(),
                    },
                    ..SubtitleSettings::default()
                },
            }],
            scenes: vec![scene_with_audio()],
        };
        assert!(validate_project(&project).is_ok());
    }

    #[test]
    fn rejects_bad_hex_color() {
        assert!(validate_hex_color("#ZZZZZZ").is_err());
        assert!(validate_hex_color("FFFFFF").is_err());
        assert!(validate_hex_color("#FFF").is_err());
        assert!(validate_hex_color("#FFFFFF").is_ok());
    }
}
