//! Lifecycle manager for the long-lived Whisper-style transcription sidecar.
//!
//! The sidecar is a single child process spoken to over newline-delimited JSON on
//! stdin/stdout. The manager owns its lifecycle (`stopped -> starting -> ready ->
//! idle -> (ready|stopped) -> crashed -> starting ...`, terminating in `unhealthy`
//! once restarts are exhausted) and multiplexes concurrent transcription requests
//! onto it via a pending-request table keyed by request id.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;
use vclip_models::TranscriptionResult;

use crate::error::{TranscribeError, TranscribeResult};
use crate::proc_util::terminate_then_kill;
use crate::protocol::{parse_line, SidecarMessage, TranscribeRequest};

/// Where the sidecar process currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    Stopped,
    Starting,
    Ready,
    Idle,
    Crashed,
    Unhealthy,
}

/// Configuration governing sidecar startup, idling, and restart behavior.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    pub binary_path: String,
    pub startup_timeout: Duration,
    pub idle_timeout: Duration,
    pub request_timeout: Duration,
    pub restart_max_attempts: u32,
    /// Base delay for the exponential backoff applied before each restart
    /// attempt after the first. Doubles per attempt, capped at `restart_backoff_max`.
    pub restart_backoff_base: Duration,
    pub restart_backoff_max: Duration,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-sidecar".to_string(),
            startup_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(120),
            restart_max_attempts: 3,
            restart_backoff_base: Duration::from_millis(500),
            restart_backoff_max: Duration::from_secs(10),
        }
    }
}

/// Delay before restart attempt `attempt` (1-indexed; the first start, attempt 0,
/// has no delay). Doubles each attempt and saturates at `max`.
fn restart_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    base.saturating_mul(1u32 << attempt.min(16)).min(max)
}

type PendingTable = Arc<Mutex<HashMap<String, oneshot::Sender<TranscriptionResult>>>>;

struct RunningSidecar {
    child: Child,
    stdin_tx: tokio::sync::mpsc::UnboundedSender<String>,
}

/// Owns the sidecar child process and dispatches transcription requests to it.
pub struct SidecarManager {
    config: SidecarConfig,
    state: Arc<Mutex<SidecarState>>,
    pending: PendingTable,
    running: Arc<Mutex<Option<RunningSidecar>>>,
    restart_attempts: Arc<Mutex<u32>>,
    last_activity: Arc<Mutex<Instant>>,
}

impl SidecarManager {
    pub fn new(config: SidecarConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SidecarState::Stopped)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(Mutex::new(None)),
            restart_attempts: Arc::new(Mutex::new(0)),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Background task: periodically terminates the sidecar once it has sat idle
    /// (no transcription request) for longer than `idle_timeout`, releasing the
    /// model's memory. The next `transcribe` call lazily restarts it.
    pub fn spawn_idle_watcher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let check_interval = (manager.config.idle_timeout / 4).max(Duration::from_secs(1));
            loop {
                tokio::time::sleep(check_interval).await;
                let is_running = manager.running.lock().await.is_some();
                if !is_running {
                    continue;
                }
                let idle_for = manager.last_activity.lock().await.elapsed();
                if idle_for >= manager.config.idle_timeout {
                    info!(?idle_for, "transcription sidecar idle, shutting down");
                    manager.stop().await;
                }
            }
        })
    }

    pub async fn state(&self) -> SidecarState {
        *self.state.lock().await
    }

    /// Transcribe the audio at `url`, starting the sidecar if it isn't already
    /// running. Returns [`TranscribeError::SidecarUnhealthy`] if the restart budget
    /// has been exhausted.
    pub async fn transcribe(&self, url: &str) -> TranscribeResult<TranscriptionResult> {
        self.ensure_started().await?;
        *self.last_activity.lock().await = Instant::now();

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let request = TranscribeRequest::new(id.clone(), url);
        let line = serde_json::to_string(&request)?;

        {
            let running = self.running.lock().await;
            let Some(sidecar) = running.as_ref() else {
                return Err(TranscribeError::internal("sidecar not running after start"));
            };
            sidecar
                .stdin_tx
                .send(line)
                .map_err(|_| TranscribeError::SidecarCrashed("stdin channel closed".to_string()))?;
        }

        *self.state.lock().await = SidecarState::Ready;

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(TranscribeError::SidecarCrashed(
                "sidecar closed before responding".to_string(),
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(TranscribeError::RequestTimeout(self.config.request_timeout))
            }
        }
    }

    async fn ensure_started(&self) -> TranscribeResult<()> {
        if self.running.lock().await.is_some() {
            return Ok(());
        }

        let attempt = *self.restart_attempts.lock().await;
        if attempt >= self.config.restart_max_attempts {
            *self.state.lock().await = SidecarState::Unhealthy;
            return Err(TranscribeError::SidecarUnhealthy);
        }

        let backoff = restart_backoff(attempt, self.config.restart_backoff_base, self.config.restart_backoff_max);
        if !backoff.is_zero() {
            info!(attempt, ?backoff, "backing off before restarting transcription sidecar");
            tokio::time::sleep(backoff).await;
        }

        *self.state.lock().await = SidecarState::Starting;

        which::which(&self.config.binary_path).map_err(|_| TranscribeError::SidecarNotFound)?;

        let mut child = Command::new(&self.config.binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        let (stdin_tx, mut stdin_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = stdin_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
            }
        });

        let pending = self.pending.clone();
        let state = self.state.clone();
        let running = self.running.clone();
        let restart_attempts = self.restart_attempts.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                match parse_line(&line) {
                    SidecarMessage::Ready => {
                        *state.lock().await = SidecarState::Ready;
                    }
                    SidecarMessage::Response { id, result } => {
                        if let Some(tx) = pending.lock().await.remove(&id) {
                            let _ = tx.send(result);
                        }
                    }
                    SidecarMessage::Unrecognized(raw) => {
                        warn!(line = %raw, "unrecognized sidecar message");
                    }
                }
            }
            // Stdout closed: the process exited or crashed. Fail every outstanding
            // waiter so callers don't hang until their own timeout, and clear the
            // running slot so the next `transcribe` call restarts the child rather
            // than writing into a stdin pipe nobody is reading.
            error!("transcription sidecar stdout closed, treating as a crash");
            *state.lock().await = SidecarState::Crashed;
            *running.lock().await = None;
            *restart_attempts.lock().await += 1;
            // Drop every outstanding sender without a value: each waiter's `rx.await`
            // resolves to `Err`, which `transcribe` maps to `SidecarCrashed`.
            pending.lock().await.clear();
        });

        let started_at = Instant::now();
        loop {
            if *self.state.lock().await == SidecarState::Ready {
                break;
            }
            if started_at.elapsed() > self.config.startup_timeout {
                let _ = child.kill().await;
                return Err(TranscribeError::StartupTimeout(self.config.startup_timeout));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        *self.running.lock().await = Some(RunningSidecar { child, stdin_tx });
        *self.restart_attempts.lock().await = 0;

        info!("transcription sidecar ready");
        Ok(())
    }

    /// Stop the sidecar: SIGTERM, then SIGKILL if it hasn't exited within the
    /// grace period. Called on idle-timeout or shutdown.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(mut sidecar) = running.take() {
            terminate_then_kill(&mut sidecar.child, Duration::from_secs(5)).await;
        }
        *self.state.lock().await = SidecarState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_manager_starts_stopped() {
        let manager = SidecarManager::new(SidecarConfig::default());
        assert_eq!(manager.state().await, SidecarState::Stopped);
    }

    #[test]
    fn restart_backoff_is_zero_on_first_attempt_and_doubles_then_caps() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(10);
        assert_eq!(restart_backoff(0, base, max), Duration::ZERO);
        assert_eq!(restart_backoff(1, base, max), Duration::from_millis(1000));
        assert_eq!(restart_backoff(2, base, max), Duration::from_millis(2000));
        assert_eq!(restart_backoff(10, base, max), max);
    }

    #[tokio::test]
    async fn unhealthy_after_restart_budget_exhausted() {
        let manager = SidecarManager::new(SidecarConfig {
            binary_path: "definitely-not-a-real-binary-xyz".to_string(),
            restart_max_attempts: 1,
            startup_timeout: Duration::from_millis(50),
            ..SidecarConfig::default()
        });
        *manager.restart_attempts.lock().await = 1;
        let err = manager.transcribe("https://example.com/a.mp3").await.unwrap_err();
        assert!(matches!(err, TranscribeError::SidecarUnhealthy));
    }
}
