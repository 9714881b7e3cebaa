//! FFmpeg progress parsing from classic stderr output.
//!
//! Unlike `-progress pipe:2`'s machine-readable `key=value` stream, the runner reads
//! FFmpeg's human-oriented stderr: a single `Duration: HH:MM:SS.CC` line up front,
//! followed by recurring `... time=HH:MM:SS.CC ...` status lines.

use serde::{Deserialize, Serialize};

/// A progress observation derived from one `time=` line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub out_time_seconds: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    pub fn percentage(&self, total_duration_seconds: f64) -> f64 {
        if total_duration_seconds <= 0.0 {
            return 0.0;
        }
        ((self.out_time_seconds / total_duration_seconds) * 100.0).min(100.0)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;

/// Parses `Duration: HH:MM:SS.CC` lines, present once near the top of stderr.
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let idx = line.find("Duration:")?;
    let rest = &line[idx + "Duration:".len()..];
    let timestamp = rest.split(',').next()?.trim();
    parse_timestamp(timestamp)
}

/// Parses `time=HH:MM:SS.CC` tokens out of a recurring progress status line.
pub fn parse_time_line(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    let rest = &line[idx + "time=".len()..];
    let timestamp = rest.split_whitespace().next()?;
    parse_timestamp(timestamp)
}

fn parse_timestamp(s: &str) -> Option<f64> {
    let mut parts = s.splitn(3, ':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_line() {
        let line = "  Duration: 00:01:23.45, start: 0.000000, bitrate: 128 kb/s";
        assert!((parse_duration_line(line).unwrap() - 83.45).abs() < 0.01);
    }

    #[test]
    fn parses_time_progress_line() {
        let line = "frame=  120 fps= 30 q=-1.0 size=     512kB time=00:00:04.00 bitrate= 800.0kbits/s speed=1.0x";
        assert!((parse_time_line(line).unwrap() - 4.0).abs() < 0.01);
    }

    #[test]
    fn non_matching_lines_return_none() {
        assert!(parse_duration_line("Input #0, mp3, from 'audio.mp3':").is_none());
        assert!(parse_time_line("Stream #0:0: Audio: mp3").is_none());
    }

    #[test]
    fn percentage_clamps_to_100() {
        let progress = FfmpegProgress {
            out_time_seconds: 12.0,
            is_complete: false,
        };
        assert!((progress.percentage(10.0) - 100.0).abs() < 0.01);
        assert!((progress.percentage(24.0) - 50.0).abs() < 0.01);
    }
}
