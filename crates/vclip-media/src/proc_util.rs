//! Shared subprocess termination helper used by the FFprobe and FFmpeg runners.

use std::time::Duration;

use tokio::process::Child;
use tracing::warn;

/// Send SIGTERM and give the process `grace` to exit on its own; if it hasn't,
/// force it with SIGKILL. `child.start_kill()` always sends SIGKILL, which a
/// process can't catch to flush output or clean up, so the cooperative signal is
/// sent directly via `libc::kill` first.
pub(crate) async fn terminate_then_kill(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is this child's own pid, valid for the lifetime of `child`.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!(pid, "SIGTERM delivery failed, falling back to SIGKILL");
            let _ = child.start_kill();
            let _ = child.wait().await;
            return;
        }
    } else {
        let _ = child.start_kill();
        let _ = child.wait().await;
        return;
    }

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!("process ignored SIGTERM within the grace period, sending SIGKILL");
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}
