//! Read-only views of the process table (`/proc`).
//!
//! Everything here tolerates processes vanishing mid-scan: a pid whose files
//! cannot be read is simply skipped.

use crate::error::validate_pid_for_check;
use chrono::{DateTime, Utc};
use nix::sys::signal;
use std::fs;

/// The fields of `/proc/<pid>/stat` the supervisor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcStat {
    pub pid: u32,
    pub state: char,
    pub ppid: u32,
    pub pgrp: i32,
    /// Start time in clock ticks since boot.
    pub starttime: u64,
}

impl ProcStat {
    pub fn is_zombie(&self) -> bool {
        matches!(self.state, 'Z' | 'X')
    }
}

/// Parse the contents of `/proc/<pid>/stat`.
///
/// The command name sits in parentheses and may itself contain spaces or
/// parentheses, so fields are taken after the last `)`.
pub fn parse_stat(contents: &str) -> Option<ProcStat> {
    let open = contents.find('(')?;
    let close = contents.rfind(')')?;
    let pid = contents[..open].trim().parse().ok()?;
    let fields: Vec<&str> = contents.get(close + 2..)?.split_whitespace().collect();

    Some(ProcStat {
        pid,
        state: fields.first()?.chars().next()?,
        ppid: fields.get(1)?.parse().ok()?,
        pgrp: fields.get(2)?.parse().ok()?,
        starttime: fields.get(19)?.parse().ok()?,
    })
}

pub fn read_stat(pid: u32) -> Option<ProcStat> {
    let contents = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    parse_stat(&contents)
}

/// argv of a process. Empty for kernel threads and zombies.
pub fn read_cmdline(pid: u32) -> Option<Vec<String>> {
    let raw = fs::read(format!("/proc/{}/cmdline", pid)).ok()?;
    Some(
        raw.split(|b| *b == 0)
            .filter(|arg| !arg.is_empty())
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect(),
    )
}

/// All numeric entries of `/proc`.
pub fn list_pids() -> Vec<u32> {
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .collect()
}

/// Signal-probe liveness check.
///
/// False for pids that cannot be signalled (exited, never existed, or owned
/// by someone else) and for zombies, which accept signals but will never run
/// again.
pub fn is_alive(pid: u32) -> bool {
    let Some(nix_pid) = validate_pid_for_check(pid) else {
        return false;
    };
    if signal::kill(nix_pid, None).is_err() {
        return false;
    }
    match read_stat(pid) {
        Some(stat) => !stat.is_zombie(),
        None => true,
    }
}

/// True when argv carries the class flag for `class`: either the pair
/// `--class <class>` or the single token `--class=<class>`. Exact and
/// case-sensitive.
pub fn cmdline_matches_class(argv: &[String], class: &str) -> bool {
    let joined = format!("--class={}", class);
    argv.iter().enumerate().any(|(i, arg)| {
        arg == &joined || (arg == "--class" && argv.get(i + 1).map(String::as_str) == Some(class))
    })
}

/// Live processes whose command line matches `class`, excluding ourselves.
pub fn find_by_class(class: &str) -> Vec<u32> {
    let own = std::process::id();
    let mut matches: Vec<u32> = list_pids()
        .into_iter()
        .filter(|pid| *pid != own)
        .filter(|pid| {
            read_cmdline(*pid)
                .map(|argv| cmdline_matches_class(&argv, class))
                .unwrap_or(false)
        })
        .filter(|pid| is_alive(*pid))
        .collect();
    matches.sort_unstable();
    matches
}

/// Direct children of `parent`.
pub fn children_of(parent: u32) -> Vec<u32> {
    list_pids()
        .into_iter()
        .filter(|pid| read_stat(*pid).map(|s| s.ppid == parent).unwrap_or(false))
        .collect()
}

/// Query the kernel clock tick rate (jiffies per second) at runtime.
///
/// Falls back to 100 (the common default) if sysconf fails.
fn clock_ticks_per_sec() -> u64 {
    nix::unistd::sysconf(nix::unistd::SysconfVar::CLK_TCK)
        .ok()
        .flatten()
        .map(|v| v as u64)
        .unwrap_or(100)
}

/// Check if a PID belongs to the process that was recorded at `expected_start`.
///
/// Returns false only when the live process clearly started more than 60s away
/// from the recorded time (the pid was recycled). When the start time cannot
/// be determined, the pid is trusted.
pub fn started_near(pid: u32, expected_start: DateTime<Utc>) -> bool {
    let expected_age = Utc::now().signed_duration_since(expected_start);
    if expected_age.num_hours() > 24 {
        return true;
    }

    let Some(stat) = read_stat(pid) else {
        return true;
    };
    let Some(uptime_secs) = fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|s| s.split_whitespace().next()?.parse::<f64>().ok())
    else {
        return true;
    };

    let process_age_secs = uptime_secs - (stat.starttime as f64 / clock_ticks_per_sec() as f64);
    let expected_age_secs = expected_age.num_milliseconds() as f64 / 1000.0;
    let time_diff = (process_age_secs - expected_age_secs).abs();

    if time_diff > 60.0 {
        tracing::warn!(
            "PID {} appears to be reused: process age {:.0}s vs expected {:.0}s",
            pid,
            process_age_secs,
            expected_age_secs
        );
        return false;
    }
    true
}
