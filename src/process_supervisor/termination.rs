//! Graceful-then-forced process termination

use serde::Serialize;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::timeout;

/// Default grace period between SIGTERM and SIGKILL
pub const DEFAULT_GRACE: Duration = Duration::from_millis(3000);

/// How a process ended when asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// Had already exited before the signal
    AlreadyExited,
    /// Exited within the grace period
    Exited,
    /// Ignored the graceful signal and was force-killed
    Killed,
}

/// Ask the process to exit, wait up to `grace`, then force-kill it.
///
/// Never blocks longer than `grace` plus the time to reap a killed process.
pub async fn terminate(child: &mut Child, grace: Duration) -> TerminationOutcome {
    if let Ok(Some(_)) = child.try_wait() {
        return TerminationOutcome::AlreadyExited;
    }
    let Some(pid) = child.id() else {
        return TerminationOutcome::AlreadyExited;
    };

    send_graceful_signal(child, pid);

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(pid, status = %status, "Process exited after terminate signal");
            TerminationOutcome::Exited
        }
        Ok(Err(e)) => {
            tracing::warn!(pid, error = %e, "Waiting for process failed, forcing kill");
            force_kill(child, pid).await
        }
        Err(_) => {
            tracing::warn!(
                pid,
                grace_ms = grace.as_millis() as u64,
                "Process ignored terminate signal, forcing kill"
            );
            force_kill(child, pid).await
        }
    }
}

#[cfg(unix)]
fn send_graceful_signal(child: &mut Child, pid: u32) {
    // SAFETY: pid belongs to a child we still own and have not reaped
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        tracing::debug!(pid, error = %err, "SIGTERM failed, killing directly");
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn send_graceful_signal(child: &mut Child, _pid: u32) {
    let _ = child.start_kill();
}

async fn force_kill(child: &mut Child, pid: u32) -> TerminationOutcome {
    if let Err(e) = child.kill().await {
        tracing::error!(pid, error = %e, "Forced kill failed");
    }
    TerminationOutcome::Killed
}
