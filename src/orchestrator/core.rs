use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::process::{KillReport, ProcessLifecycleManager};
use crate::state::{InvocationLock, LifecycleState, PidRecord, PidRegistry, Role};
use crate::window::WindowManager;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a foreground invocation waits for the invocation lock.
pub const FOREGROUND_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a watcher-triggered restart waits for the invocation lock.
pub const WATCHER_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait for a freshly launched window to map before moving it.
const PLACE_TIMEOUT: Duration = Duration::from_secs(1);
const PLACE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the application is being launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Toggle/restart the visible window and keep a theme watcher running.
    Normal,
    /// Start hidden and ready, without a watcher.
    Prewarm,
}

impl LaunchMode {
    pub fn is_prewarm(self) -> bool {
        matches!(self, LaunchMode::Prewarm)
    }
}

/// What happened to the theme watcher during a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatcherOutcome {
    Started { pid: u32 },
    /// Auto-restart is off for this instance; the launch itself succeeded.
    Unavailable { reason: String },
    NotRequested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchOutcome {
    pub mode: LaunchMode,
    pub pid: u32,
    /// Whether a window existed before launching; `None` when unknown.
    pub window_existed: Option<bool>,
    pub killed: KillReport,
    pub watcher: WatcherOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    pub watcher: Option<KillReport>,
    pub application: KillReport,
}

impl StopOutcome {
    pub fn is_noop(&self) -> bool {
        self.watcher.is_none() && self.application.is_noop()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub class: String,
    pub state_dir: PathBuf,
    pub lifecycle: LifecycleState,
    pub application: Option<PidRecord>,
    pub watcher: Option<PidRecord>,
    /// Whether the window manager shows a window; `None` when unknown.
    pub window: Option<bool>,
}

/// Single-instance supervisor for the launcher window and its theme watcher.
///
/// All coordination between invocations goes through the pid records in
/// [`PidRegistry`] and the invocation lock; a `Supervisor` itself lives for
/// one invocation (or for the lifetime of the background watcher).
///
/// # Example
///
/// ```no_run
/// use gell_supervisor::{LaunchMode, Supervisor, SupervisorConfig};
///
/// # async fn example() -> gell_supervisor::Result<()> {
/// let supervisor = Supervisor::builder()
///     .config(SupervisorConfig::default())
///     .build()?;
/// let outcome = supervisor.launch(LaunchMode::Normal).await?;
/// println!("launched PID {}", outcome.pid);
/// # Ok(())
/// # }
/// ```
pub struct Supervisor {
    pub(super) config: SupervisorConfig,
    pub(super) config_path: Option<PathBuf>,
    pub(super) registry: PidRegistry,
    pub(super) processes: ProcessLifecycleManager,
    pub(super) window_manager: Arc<dyn WindowManager>,
    pub(super) watcher_program: PathBuf,
    pub(super) lifecycle: Mutex<LifecycleState>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("class", &self.config.class)
            .field("state_dir", &self.config.state_dir)
            .field("window_manager", &self.window_manager.name())
            .field("lifecycle", &*self.lifecycle.lock())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn builder() -> super::SupervisorBuilder {
        super::SupervisorBuilder::new()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// The config file this supervisor was loaded from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn registry(&self) -> &PidRegistry {
        &self.registry
    }

    pub fn processes(&self) -> &ProcessLifecycleManager {
        &self.processes
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.lock()
    }

    pub(super) fn transition(&self, next: LifecycleState) {
        let mut current = self.lifecycle.lock();
        debug_assert!(
            current.can_transition_to(next),
            "illegal lifecycle transition {} -> {}",
            *current,
            next
        );
        tracing::debug!("Lifecycle {} -> {}", *current, next);
        *current = next;
    }

    pub(super) async fn lock(&self, timeout: Duration) -> Result<Option<InvocationLock>> {
        InvocationLock::acquire(&self.config.state_dir, timeout).await
    }

    /// Ask the window manager whether our window exists.
    ///
    /// `None` when the window manager cannot be asked; callers then proceed
    /// as if it might.
    pub async fn window_exists(&self) -> Option<bool> {
        match self.window_manager.exists(&self.config.class).await {
            Ok(exists) => Some(exists),
            Err(e) => {
                if !self.window_manager.is_enabled() {
                    tracing::debug!("{}", e);
                } else {
                    tracing::warn!("Cannot query windows, assuming unknown: {}", e);
                }
                None
            }
        }
    }

    /// Best-effort move of the new window onto the launcher workspace.
    pub(super) async fn place_window(&self) {
        let class = &self.config.class;
        let workspace = &self.config.workspace;
        let deadline = Instant::now() + PLACE_TIMEOUT;

        loop {
            match self.window_manager.exists(class).await {
                Ok(true) => break,
                Ok(false) if Instant::now() < deadline => {
                    tokio::time::sleep(PLACE_POLL_INTERVAL).await
                }
                Ok(false) => {
                    tracing::debug!("Window '{}' not mapped yet, skipping placement", class);
                    return;
                }
                Err(e) => {
                    tracing::debug!("Skipping window placement: {}", e);
                    return;
                }
            }
        }

        match self
            .window_manager
            .move_to_workspace(class, workspace)
            .await
        {
            Ok(()) => tracing::debug!("Moved '{}' to {}", class, workspace),
            Err(e) => tracing::warn!("Failed to move window to {}: {}", workspace, e),
        }
    }

    /// Live view of both roles plus what the window manager reports.
    pub async fn status(&self) -> StatusReport {
        let snapshot = self.registry.snapshot();
        StatusReport {
            class: self.config.class.clone(),
            state_dir: self.config.state_dir.clone(),
            lifecycle: snapshot.application_state(),
            application: snapshot.application,
            watcher: snapshot.watcher,
            window: self.window_exists().await,
        }
    }

    /// Stop the watcher, kill the application and clear both records.
    #[tracing::instrument(skip(self))]
    pub async fn stop_all(&self) -> Result<StopOutcome> {
        let _lock = self.lock(FOREGROUND_LOCK_TIMEOUT).await?;

        let keep: Vec<u32> = self.registry.read(Role::Application).into_iter().collect();
        let watcher = match self.stop_watcher_keeping(&keep).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Failed to stop theme watcher: {}", e);
                None
            }
        };
        let application = self.kill_application().await;
        for role in Role::ALL {
            self.registry.remove(role)?;
        }
        Ok(StopOutcome {
            watcher,
            application,
        })
    }
}
