use super::table;
use crate::error::validate_pid;
use nix::sys::signal::{self, Signal};
use nix::unistd::getpgid;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Liveness poll interval while waiting out the grace period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for SIGKILLed processes to disappear.
const REAP_WAIT: Duration = Duration::from_millis(500);

/// Outcome of a kill. Empty when there was nothing to kill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KillReport {
    /// Pids that were sent SIGTERM.
    pub signalled: Vec<u32>,
    /// Pids that survived the grace period and were sent SIGKILL.
    pub forced: Vec<u32>,
}

impl KillReport {
    pub fn is_noop(&self) -> bool {
        self.signalled.is_empty() && self.forced.is_empty()
    }
}

/// Send `sig` to the process group led by `pid`, or to `pid` alone when it
/// does not lead a group.
///
/// Returns false when the process could not be signalled (already gone, or a
/// pid we refuse to touch).
pub fn signal_process(pid: u32, sig: Signal) -> bool {
    let nix_pid = match validate_pid(pid, "kill") {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("{}", e);
            return false;
        }
    };

    let is_group_leader = getpgid(Some(nix_pid)).ok() == Some(nix_pid);
    if is_group_leader && signal::killpg(nix_pid, sig).is_ok() {
        return true;
    }
    signal::kill(nix_pid, sig).is_ok()
}

/// Poll until every pid in `pids` is dead or `timeout` elapses.
///
/// `alive` decides liveness so callers can consult owned handles first.
/// Returns the survivors.
pub async fn wait_for_exit<F>(pids: &[u32], timeout: Duration, alive: F) -> Vec<u32>
where
    F: Fn(u32) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let survivors: Vec<u32> = pids.iter().copied().filter(|pid| alive(*pid)).collect();
        if survivors.is_empty() || Instant::now() >= deadline {
            return survivors;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// SIGTERM every pid, wait up to `grace`, then SIGKILL survivors.
pub async fn terminate<F>(pids: &[u32], grace: Duration, alive: F) -> KillReport
where
    F: Fn(u32) -> bool,
{
    let mut report = KillReport::default();
    for &pid in pids {
        if signal_process(pid, Signal::SIGTERM) {
            report.signalled.push(pid);
        } else {
            tracing::debug!("PID {} already gone before SIGTERM", pid);
        }
    }
    if report.signalled.is_empty() {
        return report;
    }

    let survivors = wait_for_exit(&report.signalled, grace, &alive).await;
    if survivors.is_empty() {
        return report;
    }

    tracing::warn!(
        "{} process(es) did not exit after SIGTERM (grace period: {:?}), sending SIGKILL",
        survivors.len(),
        grace
    );
    for pid in survivors {
        if signal_process(pid, Signal::SIGKILL) {
            report.forced.push(pid);
        }
    }
    let stuck = wait_for_exit(&report.forced, REAP_WAIT, &alive).await;
    if !stuck.is_empty() {
        tracing::warn!("PIDs {:?} still present after SIGKILL", stuck);
    }
    report
}

/// Signal-probe liveness, for callers with no owned handle.
pub fn probe_alive(pid: u32) -> bool {
    table::is_alive(pid)
}
