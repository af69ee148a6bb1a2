// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::fmt;
use std::io;
use thiserror::Error;

/// External component the supervisor depends on but does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    WindowManager,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::WindowManager => f.write_str("window manager"),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(gell::config::error),
        help("Check ~/.config/gell/supervisor.yaml or the file passed with --config")
    )]
    Config(String),

    #[error("{component} unavailable: {reason}")]
    #[diagnostic(code(gell::environment::unavailable))]
    EnvironmentUnavailable {
        component: Component,
        reason: String,
    },

    #[error("File watching unavailable for {path}: {reason}")]
    #[diagnostic(
        code(gell::watch::unavailable),
        help("Theme changes will not restart the launcher until the watcher can be started")
    )]
    CapabilityUnavailable { path: String, reason: String },

    #[error("Failed to launch '{program}': {reason}")]
    #[diagnostic(
        code(gell::process::spawn_failed),
        help("Check that the terminal and application commands exist and are executable")
    )]
    SpawnFailure { program: String, reason: String },

    #[error("Process error: {0}")]
    #[diagnostic(code(gell::process::error))]
    Process(String),

    #[error("Invalid PID {pid}: {reason}")]
    InvalidPid { pid: u32, reason: String },

    #[error("Filesystem error: {0}")]
    #[diagnostic(code(gell::filesystem::error))]
    Filesystem(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn window_manager(reason: impl Into<String>) -> Self {
        Error::EnvironmentUnavailable {
            component: Component::WindowManager,
            reason: reason.into(),
        }
    }

    /// True for conditions the supervisor degrades around instead of aborting.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::EnvironmentUnavailable { .. } | Error::CapabilityUnavailable { .. }
        )
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::SpawnFailure { program, .. } => Some(format!(
                "Make sure '{}' is installed and on PATH, or set `terminal:` / `command:` in supervisor.yaml.",
                program
            )),
            Error::Config(_) | Error::Yaml(_) => Some(
                "Fix or remove ~/.config/gell/supervisor.yaml; every key has a default.".to_string(),
            ),
            Error::EnvironmentUnavailable {
                component: Component::WindowManager,
                ..
            } => Some("Is Hyprland running? `hyprctl clients` must work from this shell.".to_string()),
            Error::CapabilityUnavailable { path, .. } => Some(format!(
                "Create the directory containing {} so it can be watched.",
                path
            )),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

/// Validates and converts a u32 PID to nix::unistd::Pid safely.
/// Returns Err for PID 0 (process group), PID 1 (init), or values > i32::MAX.
pub fn validate_pid(pid: u32, role: &str) -> Result<nix::unistd::Pid> {
    if pid == 0 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!(
                "PID 0 is invalid for {} (refers to process group, not a process)",
                role
            ),
        });
    }
    if pid == 1 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!("refusing to signal PID 1 (init) for {}", role),
        });
    }
    if pid > i32::MAX as u32 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!("PID {} exceeds i32::MAX for {}", pid, role),
        });
    }
    Ok(nix::unistd::Pid::from_raw(pid as i32))
}

/// Same as validate_pid but allows PID 1 for read-only existence checks.
pub fn validate_pid_for_check(pid: u32) -> Option<nix::unistd::Pid> {
    if pid == 0 || pid > i32::MAX as u32 {
        return None;
    }
    Some(nix::unistd::Pid::from_raw(pid as i32))
}
