use crate::error::{Error, Result};
use crate::process::{probe_alive, table, terminate, KillReport};
use crate::state::{PidRegistry, Role};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Effective configuration handed to the background watcher.
pub const WATCHER_CONFIG_FILE: &str = "watcher.yaml";

/// Background watcher log, appended to across runs.
pub const WATCHER_LOG_FILE: &str = "watcher.log";

/// Start `<program> watch --config <config_path> --log-file <log_path>` as a
/// detached session leader and return its pid.
///
/// The new session keeps the watcher alive after the invoking terminal or
/// hotkey daemon goes away.
pub fn spawn_watcher(program: &Path, config_path: &Path, log_path: &Path) -> Result<u32> {
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| {
            Error::Filesystem(format!("Failed to open {}: {}", log_path.display(), e))
        })?;

    let mut cmd = Command::new(program);
    cmd.arg("watch")
        .arg("--config")
        .arg(config_path)
        .arg("--log-file")
        .arg(log_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(log))
        .kill_on_drop(false);

    // SAFETY: pre_exec runs in the child between fork() and exec(), where only
    // async-signal-safe functions may be called. The closure captures nothing
    // and only calls setsid(), which is async-signal-safe per POSIX.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(|e| Error::SpawnFailure {
        program: program.display().to_string(),
        reason: e.to_string(),
    })?;
    let pid = child.id().ok_or_else(|| Error::SpawnFailure {
        program: program.display().to_string(),
        reason: "watcher exited immediately".to_string(),
    })?;
    tracing::info!("Started theme watcher (PID {})", pid);
    Ok(pid)
}

/// Stop the recorded watcher and its helper children, then clear its record.
///
/// Children that are application windows (matching `class`, or listed in
/// `keep`) are left running: after a theme restart the watcher is the parent
/// of the live application. Idempotent; returns `None` when no live watcher
/// was recorded.
#[tracing::instrument(skip(registry, keep))]
pub async fn stop_watcher(
    registry: &PidRegistry,
    class: &str,
    keep: &[u32],
    grace: Duration,
) -> Result<Option<KillReport>> {
    let Some(record) = registry.read_live(Role::Watcher) else {
        registry.remove(Role::Watcher)?;
        return Ok(None);
    };
    let pid = record.pid;
    if pid == std::process::id() {
        tracing::debug!("Not stopping the watcher from inside itself");
        return Ok(None);
    }

    let helpers: Vec<u32> = table::children_of(pid)
        .into_iter()
        .filter(|child| !keep.contains(child))
        .filter(|child| {
            !table::read_cmdline(*child)
                .map(|argv| table::cmdline_matches_class(&argv, class))
                .unwrap_or(false)
        })
        .collect();

    let mut targets = vec![pid];
    targets.extend(helpers);
    let report = terminate(&targets, grace, probe_alive).await;

    registry.remove_if(Role::Watcher, pid)?;
    tracing::info!("Stopped theme watcher (PID {})", pid);
    Ok(Some(report))
}
