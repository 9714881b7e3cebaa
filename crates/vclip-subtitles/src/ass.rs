//! ASS (Advanced SubStation Alpha) subtitle event generation and file emission.

use std::path::Path;

use tracing::debug;
use vclip_models::{AssEvent, SubtitlePosition, SubtitleSettings, SubtitleStyle, TimingSegment, TranscriptionResult};

use crate::error::SubtitlesResult;

const STYLE_NAME: &str = "Default";

/// A silence gap at least this long between two words is treated as a sentence
/// break for progressive reveal, same as terminal punctuation. Source modules
/// disagreed on the exact rule; this threshold was picked as a reasonable
/// "new breath, new beat" cutoff.
const SENTENCE_GAP_THRESHOLD_SECONDS: f64 = 0.75;

/// Build the ASS dialogue events for one scene's transcript, anchored to the
/// scene's window on the composed timeline.
///
/// Progressive mode reveals one additional word per event; the displayed text
/// resets to just the new word at a sentence boundary (terminal punctuation or a
/// silence gap past [`SENTENCE_GAP_THRESHOLD_SECONDS`]) and always resets at a
/// scene boundary, since a scene's transcript is independent of its neighbors.
/// Classic mode emits a single event spanning the whole scene.
pub fn build_scene_events(
    segment: &TimingSegment,
    transcript: &TranscriptionResult,
    style: SubtitleStyle,
) -> Vec<AssEvent> {
    if !transcript.success || transcript.words.is_empty() {
        if transcript.text.is_empty() {
            return Vec::new();
        }
        return vec![AssEvent {
            start: segment.start_seconds,
            end: segment.end_seconds,
            text: transcript.text.clone(),
            style: STYLE_NAME.to_string(),
        }];
    }

    match style {
        SubtitleStyle::Classic => vec![AssEvent {
            start: segment.start_seconds,
            end: segment.end_seconds,
            text: transcript.text.clone(),
            style: STYLE_NAME.to_string(),
        }],
        SubtitleStyle::Progressive => {
            let words = clamp_overlapping_words(&transcript.words);
            let mut events = Vec::with_capacity(words.len());
            let mut revealed = String::new();
            for (i, word) in words.iter().enumerate() {
                let starts_new_sentence = i > 0
                    && (ends_sentence(&words[i - 1].word)
                        || word.start - words[i - 1].end >= SENTENCE_GAP_THRESHOLD_SECONDS);
                if starts_new_sentence {
                    revealed.clear();
                }
                if !revealed.is_empty() {
                    revealed.push(' ');
                }
                revealed.push_str(&word.word);

                let event_start = segment.start_seconds + word.start;
                let event_end = words
                    .get(i + 1)
                    .map(|next| segment.start_seconds + next.start)
                    .unwrap_or(segment.end_seconds)
                    .min(segment.end_seconds);

                events.push(AssEvent {
                    start: event_start.min(segment.end_seconds),
                    end: event_end.max(event_start),
                    text: revealed.clone(),
                    style: STYLE_NAME.to_string(),
                });
            }
            events
        }
    }
}

fn ends_sentence(word: &str) -> bool {
    matches!(word.trim_end().chars().last(), Some('.') | Some('!') | Some('?'))
}

/// Fixes up raw transcription word timestamps so they're non-overlapping and
/// monotonically ordered: a word's start is clamped forward to the previous
/// word's end when the transcriber reported an overlap.
fn clamp_overlapping_words(words: &[vclip_models::Word]) -> Vec<vclip_models::Word> {
    let mut out: Vec<vclip_models::Word> = Vec::with_capacity(words.len());
    for word in words {
        let mut w = word.clone();
        if let Some(prev) = out.last() {
            if w.start < prev.end {
                w.start = prev.end;
            }
            if w.end < w.start {
                w.end = w.start;
            }
        }
        out.push(w);
    }
    out
}

fn alignment_code(position: SubtitlePosition) -> u8 {
    // ASS numpad alignment: 2 = bottom-center, 5 = middle-center, 8 = top-center.
    match position {
        SubtitlePosition::Bottom => 2,
        SubtitlePosition::Center => 5,
        SubtitlePosition::Top => 8,
    }
}

fn ass_color(hex: &str) -> String {
    // ASS colors are &HAABBGGRR; we render fully opaque and reverse RGB -> BGR.
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return "&H00FFFFFF".to_string();
    }
    let r = &hex[0..2];
    let g = &hex[2..4];
    let b = &hex[4..6];
    format!("&H00{b}{g}{r}").to_uppercase()
}

fn format_time(seconds: f64) -> String {
    let total_centis = (seconds.max(0.0) * 100.0).round() as i64;
    let centis = total_centis % 100;
    let total_seconds = total_centis / 100;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let mins = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{mins:02}:{secs:02}.{centis:02}")
}

fn render_header(settings: &SubtitleSettings, width: u32, height: u32) -> String {
    let primary = ass_color(&settings.colors.word);
    let outline = ass_color(&settings.colors.outline);
    let alignment = alignment_code(settings.position);

    format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, OutlineColour, Bold, BorderStyle, Outline, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: {STYLE_NAME},{font},{size},{primary},{outline},1,1,2,{alignment},40,40,60,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        font = settings.font_family,
        size = settings.font_size,
    )
}

fn render_event(event: &AssEvent) -> String {
    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
        format_time(event.start),
        format_time(event.end),
        event.style,
        event.text.replace('\n', "\\N")
    )
}

/// Render a full `.ass` document from the accumulated events.
pub fn render_document(settings: &SubtitleSettings, width: u32, height: u32, events: &[AssEvent]) -> String {
    let mut doc = render_header(settings, width, height);
    for event in events {
        doc.push_str(&render_event(event));
    }
    doc
}

/// Write the document to `path` atomically: write to a sibling temp file, then
/// rename into place, so a concurrent reader never observes a partial file.
pub async fn write_ass_file(path: &Path, contents: &str) -> SubtitlesResult<()> {
    let tmp_path = path.with_extension("ass.tmp");
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    debug!(path = %path.display(), "wrote ass subtitle file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::Word;

    fn segment(start: f64, end: f64) -> TimingSegment {
        TimingSegment {
            start_seconds: start,
            end_seconds: end,
            audio_url: "a.mp3".to_string(),
        }
    }

    fn transcript() -> TranscriptionResult {
        TranscriptionResult {
            text: "hi there friend".to_string(),
            words: vec![
                Word {
                    word: "hi".to_string(),
                    start: 0.0,
                    end: 0.3,
                },
                Word {
                    word: "there".to_string(),
                    start: 0.3,
                    end: 0.6,
                },
                Word {
                    word: "friend".to_string(),
                    start: 0.6,
                    end: 1.0,
                },
            ],
            success: true,
        }
    }

    #[test]
    fn classic_style_emits_one_event_per_scene() {
        let events = build_scene_events(&segment(10.0, 14.0), &transcript(), SubtitleStyle::Classic);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, 10.0);
        assert_eq!(events[0].end, 14.0);
        assert_eq!(events[0].text, "hi there friend");
    }

    #[test]
    fn progressive_style_reveals_cumulatively_and_resets_per_scene() {
        let events = build_scene_events(&segment(10.0, 14.0), &transcript(), SubtitleStyle::Progressive);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].text, "hi");
        assert_eq!(events[1].text, "hi there");
        assert_eq!(events[2].text, "hi there friend");
        assert_eq!(events[0].start, 10.0);
        assert_eq!(events[2].end, 14.0);
    }

    #[test]
    fn progressive_reveal_resets_at_terminal_punctuation() {
        let transcript = TranscriptionResult {
            text: "hi there. friend now".to_string(),
            words: vec![
                Word { word: "hi".to_string(), start: 0.0, end: 0.3 },
                Word { word: "there.".to_string(), start: 0.3, end: 0.6 },
                Word { word: "friend".to_string(), start: 0.7, end: 1.0 },
                Word { word: "now".to_string(), start: 1.0, end: 1.3 },
            ],
            success: true,
        };
        let events = build_scene_events(&segment(0.0, 2.0), &transcript, SubtitleStyle::Progressive);
        assert_eq!(events[0].text, "hi");
        assert_eq!(events[1].text, "hi there.");
        // Sentence ended at "there." so "friend" starts a fresh reveal.
        assert_eq!(events[2].text, "friend");
        assert_eq!(events[3].text, "friend now");
    }

    #[test]
    fn progressive_reveal_resets_after_a_long_silence_gap() {
        let transcript = TranscriptionResult {
            text: "hi friend".to_string(),
            words: vec![
                Word { word: "hi".to_string(), start: 0.0, end: 0.3 },
                Word { word: "friend".to_string(), start: 3.0, end: 3.3 },
            ],
            success: true,
        };
        let events = build_scene_events(&segment(0.0, 5.0), &transcript, SubtitleStyle::Progressive);
        assert_eq!(events[0].text, "hi");
        assert_eq!(events[1].text, "friend");
    }

    #[test]
    fn progressive_reveal_clamps_overlapping_word_timestamps() {
        let transcript = TranscriptionResult {
            text: "hi friend".to_string(),
            words: vec![
                Word { word: "hi".to_string(), start: 0.0, end: 0.5 },
                // Reported start overlaps the previous word's end.
                Word { word: "friend".to_string(), start: 0.2, end: 0.8 },
            ],
            success: true,
        };
        let events = build_scene_events(&segment(0.0, 2.0), &transcript, SubtitleStyle::Progressive);
        assert_eq!(events[0].end, events[1].start);
    }

    #[test]
    fn failed_transcript_with_no_words_falls_back_to_full_text_or_empty() {
        let empty = TranscriptionResult::empty();
        let events = build_scene_events(&segment(0.0, 5.0), &empty, SubtitleStyle::Progressive);
        assert!(events.is_empty());
    }

    #[test]
    fn time_formatting_matches_ass_convention() {
        assert_eq!(format_time(0.0), "0:00:00.00");
        assert_eq!(format_time(83.45), "0:01:23.45");
        assert_eq!(format_time(3661.5), "1:01:01.50");
    }

    #[test]
    fn hex_color_converts_to_ass_bgr() {
        assert_eq!(ass_color("#FFFFFF"), "&H00FFFFFF");
        assert_eq!(ass_color("#FF0000"), "&H000000FF");
    }
}
