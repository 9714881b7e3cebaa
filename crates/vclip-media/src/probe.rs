//! FFprobe-backed media probing.
//!
//! Scene durations are derived from the real length of each scene's audio file, not
//! from transcript word timings, so probing runs against the audio URL directly
//! rather than a file already on disk. The background video's intrinsic duration is
//! probed the same way, so the composer can loop it just enough to cover the render
//! instead of looping indefinitely.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::watch;

use crate::error::{MediaError, MediaResult};
use crate::proc_util::terminate_then_kill;

/// Grace period between SIGTERM and SIGKILL when a probe is cancelled or times out.
const PROBE_KILL_GRACE: Duration = Duration::from_secs(3);

/// Metadata extracted from a scene's audio source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub duration: f64,
    pub codec: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
}

/// Probe an audio URL for duration and codec, invoking `ffprobe` directly against
/// the URL (no local download required for metadata extraction). `cancel_rx`, when
/// given, lets an in-flight probe be killed by the same cancellation signal that
/// governs the rest of the job; `timeout` bounds how long a single probe may run.
pub async fn probe_audio(
    url: &str,
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
) -> MediaResult<AudioInfo> {
    let probe = run_ffprobe(url, cancel_rx, timeout).await?;

    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| MediaError::probe_failed("no audio stream found", None))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::probe_failed("ffprobe output had no duration", None))?;

    Ok(AudioInfo {
        duration,
        codec: audio_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Probe a video URL for its intrinsic duration, used to compute how many times
/// the composer needs to loop a background video to cover the render.
pub async fn probe_video_duration(
    url: &str,
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
) -> MediaResult<f64> {
    let probe = run_ffprobe(url, cancel_rx, timeout).await?;

    probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::probe_failed("ffprobe output had no duration", None))
}

async fn run_ffprobe(
    url: &str,
    mut cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
) -> MediaResult<FfprobeOutput> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let mut child = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout = child.stdout.take().expect("stdout not captured");
    let mut stderr = child.stderr.take().expect("stderr not captured");
    let stdout_handle = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        buf
    });
    let stderr_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let timeout_future = async {
        if let Some(d) = timeout {
            tokio::time::sleep(d).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(timeout_future);

    let cancel_future = async {
        match cancel_rx.as_mut() {
            Some(rx) => {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            }
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(cancel_future);

    let wait_future = child.wait();
    tokio::pin!(wait_future);

    let status = tokio::select! {
        result = &mut wait_future => result?,
        _ = &mut timeout_future => {
            terminate_then_kill(&mut child, PROBE_KILL_GRACE).await;
            let _ = stdout_handle.await;
            let _ = stderr_handle.await;
            return Err(MediaError::Timeout(timeout.unwrap_or_default().as_secs()));
        }
        _ = &mut cancel_future => {
            terminate_then_kill(&mut child, PROBE_KILL_GRACE).await;
            let _ = stdout_handle.await;
            let _ = stderr_handle.await;
            return Err(MediaError::Cancelled);
        }
    };

    let stdout_bytes = stdout_handle.await.unwrap_or_default();
    let stderr_text = stderr_handle.await.unwrap_or_default();

    if !status.success() {
        return Err(MediaError::probe_failed(
            "ffprobe exited with non-zero status",
            Some(stderr_text),
        ));
    }

    Ok(serde_json::from_slice(&stdout_bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> &'static str {
        r#"{
            "format": {"duration": "12.345000"},
            "streams": [{"codec_type": "audio", "codec_name": "mp3"}]
        }"#
    }

    #[test]
    fn parses_duration_and_codec_from_ffprobe_json() {
        let probe: FfprobeOutput = serde_json::from_str(sample_output()).unwrap();
        assert_eq!(probe.format.duration.as_deref(), Some("12.345000"));
        assert_eq!(probe.streams[0].codec_name.as_deref(), Some("mp3"));
    }

    #[test]
    fn rejects_output_with_no_audio_stream() {
        let json = r#"{"format": {"duration": "1.0"}, "streams": [{"codec_type": "video"}]}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!(probe.streams.iter().all(|s| s.codec_type != "audio"));
    }

    #[test]
    fn parses_video_duration_without_requiring_an_audio_stream() {
        let json = r#"{"format": {"duration": "30.0"}, "streams": [{"codec_type": "video", "codec_name": "h264"}]}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.format.duration.as_deref(), Some("30.0"));
    }
}
