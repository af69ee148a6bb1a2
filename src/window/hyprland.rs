use super::{Client, WindowManager};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Upper bound on a single `hyprctl` call.
pub const HYPRCTL_TIMEOUT: Duration = Duration::from_secs(2);

const INSTANCE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";

#[derive(Debug, Deserialize)]
struct HyprClient {
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    workspace: HyprWorkspace,
    #[serde(default)]
    pid: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct HyprWorkspace {
    #[serde(default)]
    name: String,
}

/// Parse the output of `hyprctl -j clients`.
pub fn parse_clients(json: &str) -> Result<Vec<Client>> {
    let raw: Vec<HyprClient> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|c| Client {
            class: c.class,
            title: c.title,
            address: c.address,
            workspace: c.workspace.name,
            pid: c.pid,
        })
        .collect())
}

/// Hyprland, driven through `hyprctl`.
#[derive(Debug, Clone)]
pub struct Hyprland {
    program: String,
}

impl Default for Hyprland {
    fn default() -> Self {
        Self::new()
    }
}

impl Hyprland {
    pub fn new() -> Self {
        Self {
            program: "hyprctl".to_string(),
        }
    }

    /// Use a specific `hyprctl` binary (tests, nested sessions).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        if std::env::var_os(INSTANCE_ENV).is_none() {
            return Err(Error::window_manager(format!(
                "{} is not set (not inside a Hyprland session)",
                INSTANCE_ENV
            )));
        }
        which::which(&self.program)
            .map_err(|e| Error::window_manager(format!("{} not found: {}", self.program, e)))
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let program = self.locate()?;
        tracing::debug!("hyprctl {}", args.join(" "));

        let output = tokio::time::timeout(
            HYPRCTL_TIMEOUT,
            Command::new(&program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| Error::window_manager(format!("hyprctl timed out after {:?}", HYPRCTL_TIMEOUT)))?
        .map_err(|e| Error::window_manager(format!("failed to run hyprctl: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::window_manager(format!(
                "hyprctl {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WindowManager for Hyprland {
    async fn clients(&self) -> Result<Vec<Client>> {
        let json = self.run(&["-j", "clients"]).await?;
        parse_clients(&json)
            .map_err(|e| Error::window_manager(format!("unexpected hyprctl output: {}", e)))
    }

    async fn move_to_workspace(&self, class: &str, workspace: &str) -> Result<()> {
        let target = format!("{},class:^({})$", workspace, class);
        let reply = self
            .run(&["dispatch", "movetoworkspacesilent", &target])
            .await?;
        // hyprctl dispatch exits 0 even when the dispatcher fails
        let reply = reply.trim();
        if !reply.is_empty() && reply != "ok" {
            return Err(Error::window_manager(format!(
                "movetoworkspacesilent {}: {}",
                target, reply
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "hyprland"
    }
}
