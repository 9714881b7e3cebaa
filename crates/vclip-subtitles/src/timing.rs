//! Scene-timeline construction from real (probed) audio durations.
//!
//! Scene windows are laid out back-to-back on the composed output's timeline using
//! each scene's actual probed audio duration, never the (generally shorter)
//! duration implied by transcript word timings — a scene's window must cover its
//! full audio regardless of trailing silence the transcriber didn't recognize as
//! speech.

use vclip_models::TimingSegment;

/// Builds the ordered list of scene windows and returns the total composed
/// duration. `pad_seconds` inserts a fixed gap between consecutive scenes (0.0 for
/// back-to-back scenes with no gap).
pub fn build_timeline(scene_audio: &[(String, f64)], pad_seconds: f64) -> (Vec<TimingSegment>, f64) {
    let mut segments = Vec::with_capacity(scene_audio.len());
    let mut cursor = 0.0_f64;

    for (audio_url, duration) in scene_audio {
        let start = cursor;
        let end = start + duration;
        segments.push(TimingSegment {
            start_seconds: start,
            end_seconds: end,
            audio_url: audio_url.clone(),
        });
        cursor = end + pad_seconds;
    }

    let total = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);
    (segments, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_scenes_back_to_back_with_no_pad() {
        let scenes = vec![
            ("a.mp3".to_string(), 3.0),
            ("b.mp3".to_string(), 2.5),
        ];
        let (segments, total) = build_timeline(&scenes, 0.0);
        assert_eq!(segments[0].start_seconds, 0.0);
        assert_eq!(segments[0].end_seconds, 3.0);
        assert_eq!(segments[1].start_seconds, 3.0);
        assert_eq!(segments[1].end_seconds, 5.5);
        assert_eq!(total, 5.5);
    }

    #[test]
    fn inserts_pad_between_scenes() {
        let scenes = vec![
            ("a.mp3".to_string(), 3.0),
            ("b.mp3".to_string(), 2.0),
        ];
        let (segments, total) = build_timeline(&scenes, 1.0);
        assert_eq!(segments[1].start_seconds, 4.0);
        assert_eq!(total, 6.0);
    }

    #[test]
    fn empty_scene_list_yields_zero_duration() {
        let (segments, total) = build_timeline(&[], 0.0);
        assert!(segments.is_empty());
        assert_eq!(total, 0.0);
    }
}
