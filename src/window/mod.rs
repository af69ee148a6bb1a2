//! Window manager integration.
//!
//! The supervisor needs exactly two things from the window manager: the list
//! of live client windows (to decide whether the launcher is open) and a way
//! to move a window onto the launcher's workspace.
//!
//! - [`Hyprland`] talks to Hyprland through `hyprctl`
//! - [`NoWindowManager`] reports the window manager as unavailable, so every
//!   decision falls back to the process table

mod hyprland;

pub use hyprland::{parse_clients, Hyprland, HYPRCTL_TIMEOUT};

use crate::config::WindowManagerKind;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A mapped client window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub class: String,
    pub title: String,
    pub address: String,
    pub workspace: String,
    #[serde(default)]
    pub pid: Option<i64>,
}

#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Every client window currently known to the window manager.
    async fn clients(&self) -> Result<Vec<Client>>;

    /// Move windows of `class` to `workspace` without focusing it.
    async fn move_to_workspace(&self, class: &str, workspace: &str) -> Result<()>;

    /// Whether a window with exactly this class exists.
    async fn exists(&self, class: &str) -> Result<bool> {
        Ok(self.clients().await?.iter().any(|c| c.class == class))
    }

    fn name(&self) -> &str;

    /// False when window queries are switched off and always fail.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Window manager stand-in used when integration is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWindowManager;

#[async_trait]
impl WindowManager for NoWindowManager {
    async fn clients(&self) -> Result<Vec<Client>> {
        Err(Error::window_manager("window manager integration is disabled"))
    }

    async fn move_to_workspace(&self, _class: &str, _workspace: &str) -> Result<()> {
        Err(Error::window_manager("window manager integration is disabled"))
    }

    fn name(&self) -> &str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub fn from_kind(kind: WindowManagerKind) -> Arc<dyn WindowManager> {
    match kind {
        WindowManagerKind::Hyprland => Arc::new(Hyprland::new()),
        WindowManagerKind::None => Arc::new(NoWindowManager),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Client>);

    #[async_trait]
    impl WindowManager for Fixed {
        async fn clients(&self) -> Result<Vec<Client>> {
            Ok(self.0.clone())
        }

        async fn move_to_workspace(&self, _class: &str, _workspace: &str) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn client(class: &str) -> Client {
        Client {
            class: class.to_string(),
            title: "t".to_string(),
            address: "0x1".to_string(),
            workspace: "1".to_string(),
            pid: None,
        }
    }

    #[tokio::test]
    async fn exists_matches_class_exactly() {
        let wm = Fixed(vec![client("gell-dev"), client("firefox")]);
        assert!(!wm.exists("gell").await.unwrap());
        assert!(!wm.exists("Firefox").await.unwrap());
        assert!(wm.exists("firefox").await.unwrap());
    }

    #[tokio::test]
    async fn disabled_window_manager_is_unavailable() {
        let wm = from_kind(WindowManagerKind::None);
        assert_eq!(wm.name(), "none");
        assert!(!wm.is_enabled());
        assert!(Fixed(Vec::new()).is_enabled());
        let err = wm.exists("gell").await.unwrap_err();
        assert!(err.is_degradable());
    }
}
