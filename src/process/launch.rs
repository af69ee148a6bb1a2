use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Fixed presentation overrides passed to the terminal on every launch.
///
/// The launcher window is a fixed 80x25 popup: no padding or margin, and
/// kitty must not restore a size remembered from a previous session.
pub const GEOMETRY_OVERRIDES: [&str; 5] = [
    "window_padding_width=0",
    "window_margin_width=0",
    "initial_window_width=80c",
    "initial_window_height=25c",
    "remember_window_size=no",
];

/// Everything needed to spawn one application window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub terminal: String,
    pub class: String,
    pub title: String,
    pub command: String,
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn from_config(config: &SupervisorConfig, prewarm: bool) -> Self {
        Self {
            terminal: config.terminal.clone(),
            class: config.class.clone(),
            title: config.title.clone(),
            command: config.command.clone(),
            args: config.app_args(prewarm),
        }
    }

    /// Arguments for the terminal program (not including the program itself).
    pub fn terminal_args(&self) -> Vec<String> {
        let mut argv = vec![
            "--class".to_string(),
            self.class.clone(),
            "--title".to_string(),
            self.title.clone(),
        ];
        for setting in GEOMETRY_OVERRIDES {
            argv.push("-o".to_string());
            argv.push(setting.to_string());
        }
        argv.push("-e".to_string());
        argv.push(self.command.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Spawn the terminal detached from our stdio, in its own process group.
    ///
    /// Returns as soon as the process exists; nothing waits for the window
    /// to map.
    pub fn spawn(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.terminal);
        cmd.args(self.terminal_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false) // The window outlives a foreground invocation
            .process_group(0); // Own group so kill reaches the hosted app too

        cmd.spawn().map_err(|e| {
            tracing::error!("Failed to spawn '{}': {}", self.terminal, e);
            Error::SpawnFailure {
                program: self.terminal.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            terminal: "kitty".to_string(),
            class: "gell".to_string(),
            title: "Gell".to_string(),
            command: "python3".to_string(),
            args: vec!["/home/u/.config/gell/app.py".to_string()],
        }
    }

    #[test]
    fn terminal_args_carry_class_title_and_geometry() {
        let argv = spec().terminal_args();
        assert_eq!(
            argv,
            vec![
                "--class",
                "gell",
                "--title",
                "Gell",
                "-o",
                "window_padding_width=0",
                "-o",
                "window_margin_width=0",
                "-o",
                "initial_window_width=80c",
                "-o",
                "initial_window_height=25c",
                "-o",
                "remember_window_size=no",
                "-e",
                "python3",
                "/home/u/.config/gell/app.py",
            ]
        );
    }

    #[test]
    fn prewarm_spec_appends_prewarm_args() {
        let config = SupervisorConfig {
            args: vec!["app.py".to_string()],
            ..Default::default()
        };
        let argv = LaunchSpec::from_config(&config, true).terminal_args();
        assert_eq!(&argv[argv.len() - 3..], ["python3", "app.py", "--prewarm"]);

        let argv = LaunchSpec::from_config(&config, false).terminal_args();
        assert_eq!(argv.last().map(String::as_str), Some("app.py"));
    }

    #[tokio::test]
    async fn missing_terminal_is_a_spawn_failure() {
        let spec = LaunchSpec {
            terminal: "/nonexistent/gell-terminal".to_string(),
            ..spec()
        };
        match spec.spawn() {
            Err(Error::SpawnFailure { program, .. }) => {
                assert_eq!(program, "/nonexistent/gell-terminal")
            }
            other => panic!("expected SpawnFailure, got {:?}", other.map(|c| c.id())),
        }
    }
}
