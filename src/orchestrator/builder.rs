use super::Supervisor;
use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::process::ProcessLifecycleManager;
use crate::state::{LifecycleState, PidRegistry};
use crate::window::{self, WindowManager};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for constructing a `Supervisor` with a fluent API.
///
/// # Example
///
/// ```no_run
/// use gell_supervisor::{Supervisor, SupervisorConfig};
///
/// # fn example() -> gell_supervisor::Result<()> {
/// let supervisor = Supervisor::builder()
///     .config(SupervisorConfig::default())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<SupervisorConfig>,
    config_path: Option<PathBuf>,
    window_manager: Option<Arc<dyn WindowManager>>,
    watcher_program: Option<PathBuf>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration. Defaults to `SupervisorConfig::default()`.
    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Record which file the configuration came from.
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override the window manager chosen by `config.window_manager`.
    pub fn window_manager(mut self, window_manager: Arc<dyn WindowManager>) -> Self {
        self.window_manager = Some(window_manager);
        self
    }

    /// Binary re-executed as `<program> watch` for the background watcher.
    ///
    /// Defaults to the current executable.
    pub fn watcher_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.watcher_program = Some(program.into());
        self
    }

    pub fn build(self) -> Result<Supervisor> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let watcher_program = match self.watcher_program {
            Some(program) => program,
            None => std::env::current_exe().map_err(|e| {
                Error::Filesystem(format!("Cannot locate the supervisor binary: {}", e))
            })?,
        };
        let window_manager = self
            .window_manager
            .unwrap_or_else(|| window::from_kind(config.window_manager));

        Ok(Supervisor {
            registry: PidRegistry::new(config.state_dir.clone()),
            processes: ProcessLifecycleManager::new(config.clone()),
            config_path: self.config_path,
            window_manager,
            watcher_program,
            lifecycle: Mutex::new(LifecycleState::Absent),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowManagerKind;

    #[test]
    fn builds_with_defaults() {
        let supervisor = SupervisorBuilder::new().build().unwrap();
        assert_eq!(supervisor.config().class, "gell");
        assert_eq!(supervisor.lifecycle(), LifecycleState::Absent);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SupervisorConfig {
            class: String::new(),
            ..Default::default()
        };
        let err = SupervisorBuilder::new().config(config).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn window_manager_follows_config() {
        let config = SupervisorConfig {
            window_manager: WindowManagerKind::None,
            ..Default::default()
        };
        let supervisor = SupervisorBuilder::new()
            .config(config)
            .watcher_program("/usr/bin/true")
            .build()
            .unwrap();
        assert_eq!(supervisor.window_manager.name(), "none");
    }
}
