//! Graceful shutdown for the dev-server child with SIGTERM → SIGKILL
//! escalation.
//!
//! On unix the dev server runs as the leader of its own process group, so
//! signals go to the whole tree (`npm run dev` → `node`, `sh -c …`). A
//! child that is not a group leader is signalled directly.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
#[cfg(unix)]
use tokio::time::timeout;
#[cfg(unix)]
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Default grace period between SIGTERM and SIGKILL.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Stop `child` and its process group, giving it `grace` to exit after
/// SIGTERM before sending SIGKILL. Always reaps the process. Group members
/// still alive once the leader is reaped are killed.
///
/// Windows has no SIGTERM equivalent, so the child is killed immediately.
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    // Already reaped: nothing to signal.
    let Some(raw) = child.id() else {
        return child.wait().await;
    };
    let Ok(pid) = i32::try_from(raw).map(Pid::from_raw) else {
        child.kill().await?;
        return child.wait().await;
    };

    match signal_tree(pid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return child.wait().await,
        Err(e) => return Err(io::Error::other(e)),
    }

    let status = if let Ok(result) = timeout(grace, child.wait()).await {
        result?
    } else {
        debug!(pid = raw, "Dev server ignored SIGTERM, sending SIGKILL");
        let _ = signal_tree(pid, Signal::SIGKILL);
        child.kill().await?;
        child.wait().await?
    };

    // Stragglers that outlived the leader would hold its output pipes open.
    if signal::killpg(pid, Signal::SIGKILL).is_ok() {
        debug!(pid = raw, "Killed remaining dev server process group members");
    }
    Ok(status)
}

/// Signal the process group led by `pid`, or `pid` alone if it leads none.
#[cfg(unix)]
fn signal_tree(pid: Pid, sig: Signal) -> Result<(), Errno> {
    match signal::killpg(pid, sig) {
        Err(Errno::ESRCH) => signal::kill(pid, sig),
        other => other,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::process::Command;
    use tokio::time::sleep;

    #[tokio::test]
    async fn shutdown_responds_to_sigterm() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let status = shutdown_child(&mut child, DEFAULT_GRACE).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn shutdown_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .expect("spawn sh");
        sleep(Duration::from_millis(100)).await;

        let status = shutdown_child(&mut child, Duration::from_millis(200)).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn shutdown_handles_already_exited() {
        let mut child = Command::new("true").spawn().expect("spawn true");
        sleep(Duration::from_millis(100)).await;
        assert!(shutdown_child(&mut child, DEFAULT_GRACE).await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_reaches_grandchildren_in_the_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("grandchild.pid");
        let script = format!("sleep 30 & echo $! > {}; wait", marker.display());
        let mut child = Command::new("sh")
            .args(["-c", &script])
            .process_group(0)
            .spawn()
            .expect("spawn sh");
        let started = Instant::now();
        while !marker.exists() && started.elapsed() < Duration::from_secs(5) {
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(50)).await;
        let grandchild: i32 = std::fs::read_to_string(&marker).unwrap().trim().parse().unwrap();

        shutdown_child(&mut child, Duration::from_millis(500)).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(!running(grandchild), "grandchild {grandchild} survived");
    }

    /// Alive and not a zombie awaiting its reaper.
    fn running(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat.contains(") Z "),
            Err(_) => signal::kill(Pid::from_raw(pid), None).is_ok(),
        }
    }
}
