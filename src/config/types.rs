use super::duration::humantime_str;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Characters a class cannot contain: it is spliced into a Hyprland
/// `class:^(...)$` regex inside a comma-separated dispatcher argument.
const CLASS_RESERVED_CHARS: &str = "\\^$.|?*+()[]{},";

/// Which window manager integration to use for window queries and placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowManagerKind {
    #[default]
    Hyprland,
    /// No integration: every query reports the window manager as unavailable.
    None,
}

/// Supervisor configuration, loaded from `supervisor.yaml`.
///
/// Every field has a default, so an empty (or missing) file yields a working
/// setup for the stock Gell install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Window class used to find, place and kill the launcher window.
    pub class: String,

    /// Window title passed to the terminal.
    pub title: String,

    /// Terminal program hosting the application (kitty-compatible flags).
    pub terminal: String,

    /// Application command run inside the terminal.
    pub command: String,

    /// Arguments for `command`.
    pub args: Vec<String>,

    /// Extra arguments appended to `args` when launching in pre-warm mode.
    pub prewarm_args: Vec<String>,

    /// Workspace the window is moved to after launch.
    pub workspace: String,

    /// Theme file whose write-completion triggers a restart.
    pub theme_path: PathBuf,

    /// Directory holding pid records, the invocation lock and watcher logs.
    pub state_dir: PathBuf,

    /// Quiet interval collapsing a burst of theme writes into one restart.
    #[serde(with = "humantime_str")]
    pub debounce: Duration,

    /// How long `kill` waits for matching processes to exit before SIGKILL.
    #[serde(with = "humantime_str")]
    pub kill_grace: Duration,

    pub window_manager: WindowManagerKind,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            class: "gell".to_string(),
            title: "Gell".to_string(),
            terminal: "kitty".to_string(),
            command: "python3".to_string(),
            args: vec![home
                .join(".config/gell/app.py")
                .to_string_lossy()
                .into_owned()],
            prewarm_args: vec!["--prewarm".to_string()],
            workspace: "special:gell".to_string(),
            theme_path: home.join(".cache/wal/colors-kitty.conf"),
            state_dir: default_state_dir(),
            debounce: Duration::from_millis(100),
            kill_grace: Duration::from_millis(300),
            window_manager: WindowManagerKind::default(),
        }
    }
}

/// `$XDG_RUNTIME_DIR/gell`, falling back to `~/.cache/gell`.
pub fn default_state_dir() -> PathBuf {
    if let Some(runtime) = dirs::runtime_dir() {
        return runtime.join("gell");
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("gell")
}

/// Expand a leading `~/` against the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

impl SupervisorConfig {
    /// Expand `~/` in every path-valued field.
    pub fn expand_paths(&mut self) {
        self.theme_path = expand_tilde(&self.theme_path);
        self.state_dir = expand_tilde(&self.state_dir);
        self.args = self
            .args
            .iter()
            .map(|arg| {
                if arg.starts_with("~/") {
                    expand_tilde(Path::new(arg)).to_string_lossy().into_owned()
                } else {
                    arg.clone()
                }
            })
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.class.is_empty() {
            return Err(Error::Config("`class` cannot be empty".to_string()));
        }
        if self.class.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "`class` '{}' must be a single token (no whitespace)",
                self.class
            )));
        }
        if let Some(c) = self.class.chars().find(|c| CLASS_RESERVED_CHARS.contains(*c)) {
            return Err(Error::Config(format!(
                "`class` '{}' must not contain '{}' (used in window manager rules)",
                self.class, c
            )));
        }
        if self.terminal.trim().is_empty() {
            return Err(Error::Config("`terminal` cannot be empty".to_string()));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Config("`command` cannot be empty".to_string()));
        }
        if self.debounce.is_zero() {
            return Err(Error::Config(
                "`debounce` must be greater than zero".to_string(),
            ));
        }
        if self.theme_path.file_name().is_none() {
            return Err(Error::Config(format!(
                "`theme_path` '{}' does not name a file",
                self.theme_path.display()
            )));
        }
        Ok(())
    }

    /// Application arguments for the given mode.
    pub fn app_args(&self, prewarm: bool) -> Vec<String> {
        let mut args = self.args.clone();
        if prewarm {
            args.extend(self.prewarm_args.iter().cloned());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SupervisorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.class, "gell");
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert!(config.theme_path.ends_with(".cache/wal/colors-kitty.conf"));
    }

    #[test]
    fn class_with_whitespace_is_rejected() {
        let config = SupervisorConfig {
            class: "gell launcher".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn class_with_rule_syntax_is_rejected() {
        for class in ["gell,floating", "gell.*", "(gell)", "gell$", r"ge\ll", "g|ell"] {
            let config = SupervisorConfig {
                class: class.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "accepted {:?}",
                class
            );
        }

        let config = SupervisorConfig {
            class: "gell-dev_2".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn zero_debounce_is_rejected() {
        let config = SupervisorConfig {
            debounce: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn prewarm_args_are_appended_only_in_prewarm_mode() {
        let config = SupervisorConfig {
            args: vec!["app.py".to_string()],
            ..Default::default()
        };
        assert_eq!(config.app_args(false), vec!["app.py"]);
        assert_eq!(config.app_args(true), vec!["app.py", "--prewarm"]);
    }

    #[test]
    fn expand_tilde_only_touches_leading_tilde() {
        let abs = Path::new("/etc/gell/~file");
        assert_eq!(expand_tilde(abs), abs.to_path_buf());
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/x.conf")), home.join("x.conf"));
        }
    }
}
