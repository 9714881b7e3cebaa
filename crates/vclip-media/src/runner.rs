//! Spawns FFmpeg, streams stderr for progress, and enforces timeout/cancellation.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::composer::ComposedCommand;
use crate::error::{MediaError, MediaResult};
use crate::proc_util::terminate_then_kill;
use crate::progress::{parse_duration_line, parse_time_line, FfmpegProgress};

/// How many trailing stderr lines are kept for [`MediaError::RenderFailed`]'s
/// sanitized tail.
const STDERR_TAIL_LINES: usize = 20;

/// Redacts anything that looks like a filesystem path or URL from a render
/// error's stderr tail before it's surfaced to a caller.
fn sanitize_stderr(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:[a-zA-Z][a-zA-Z0-9+.-]*://\S+)|(?:/\S+)").unwrap());
    re.replace_all(text, "<redacted>").to_string()
}

/// Runs a [`ComposedCommand`], enforcing an optional timeout and cooperative
/// cancellation via a `watch` channel.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
    /// Grace period between SIGTERM and SIGKILL when cancelled or timed out.
    kill_grace: std::time::Duration,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
            kill_grace: std::time::Duration::from_secs(5),
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &ComposedCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, cmd: &ComposedCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        debug!("running ffmpeg {}", cmd.argv.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&cmd.argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut reader = BufReader::new(stderr).lines();

        let tail: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let tail_writer = Arc::clone(&tail);

        let progress_handle = tokio::spawn(async move {
            let mut total_duration = None;
            while let Ok(Some(line)) = reader.next_line().await {
                {
                    let mut tail = tail_writer.lock().unwrap();
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                }
                if total_duration.is_none() {
                    if let Some(d) = parse_duration_line(&line) {
                        total_duration = Some(d);
                    }
                }
                if let Some(seconds) = parse_time_line(&line) {
                    let is_complete = total_duration
                        .map(|d| seconds >= d - 0.01)
                        .unwrap_or(false);
                    progress_callback(FfmpegProgress {
                        out_time_seconds: seconds,
                        is_complete,
                    });
                }
            }
        });

        let result = self.wait_for_completion(&mut child).await;
        let _ = progress_handle.await;

        result.map_err(|err| match err {
            MediaError::RenderFailed { message, exit_code, .. } => {
                let lines: Vec<String> = tail.lock().unwrap().iter().cloned().collect();
                let sanitized = sanitize_stderr(&lines.join("\n"));
                MediaError::render_failed(message, Some(sanitized), exit_code)
            }
            other => other,
        })
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let mut cancel_rx = self.cancel_rx.clone();

        let status = loop {
            let wait_future = child.wait();
            tokio::pin!(wait_future);

            let timeout_future = async {
                if let Some(secs) = self.timeout_secs {
                    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
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

            tokio::select! {
                result = &mut wait_future => break result,
                _ = &mut timeout_future => {
                    warn!("ffmpeg timed out, sending SIGTERM");
                    terminate_then_kill(child, self.kill_grace).await;
                    return Err(MediaError::Timeout(self.timeout_secs.unwrap_or(0)));
                }
                _ = &mut cancel_future => {
                    info!("ffmpeg cancelled, sending SIGTERM");
                    terminate_then_kill(child, self.kill_grace).await;
                    return Err(MediaError::Cancelled);
                }
            }
        };

        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::render_failed(
                "ffmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available on `PATH`.
pub fn check_ffmpeg() -> MediaResult<std::path::PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available on `PATH`.
pub fn check_ffprobe() -> MediaResult<std::path::PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_stderr_redacts_filesystem_paths() {
        let input = "Could not open file /tmp/vclip/work/abc123/subtitles.ass: No such file";
        let sanitized = sanitize_stderr(input);
        assert!(!sanitized.contains("/tmp/vclip"));
        assert!(sanitized.contains("<redacted>"));
    }

    #[test]
    fn sanitize_stderr_redacts_urls() {
        let input = "Input #0, mp3, from 'https://cdn.internal.example.com/secret/a.mp3':";
        let sanitized = sanitize_stderr(input);
        assert!(!sanitized.contains("cdn.internal.example.com"));
    }

    #[test]
    fn sanitize_stderr_leaves_plain_text_alone() {
        assert_eq!(sanitize_stderr("frame=  120 fps=30 time=00:00:04.00"), "frame=  120 fps=30 time=00:00:04.00");
    }
}
