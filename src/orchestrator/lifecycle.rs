use super::core::{LaunchMode, LaunchOutcome, Supervisor, WatcherOutcome, FOREGROUND_LOCK_TIMEOUT};
use crate::error::Result;
use crate::process::KillReport;
use crate::state::{LifecycleState, Role};

impl Supervisor {
    /// Run one foreground invocation in `mode` under the invocation lock.
    #[tracing::instrument(skip(self))]
    pub async fn launch(&self, mode: LaunchMode) -> Result<LaunchOutcome> {
        let _lock = self.lock(FOREGROUND_LOCK_TIMEOUT).await?;
        match mode {
            LaunchMode::Prewarm => self.prewarm().await,
            LaunchMode::Normal => self.normal().await,
        }
    }

    /// Replace whatever is running with a fresh hidden instance.
    ///
    /// Never leaves a watcher behind.
    async fn prewarm(&self) -> Result<LaunchOutcome> {
        let killed = self.kill_application().await;
        self.retire_watcher().await;
        let pid = self.launch_application(true).await?;
        tracing::info!("Pre-warmed '{}' (PID {})", self.config.class, pid);

        Ok(LaunchOutcome {
            mode: LaunchMode::Prewarm,
            pid,
            window_existed: None,
            killed,
            watcher: WatcherOutcome::NotRequested,
        })
    }

    /// Toggle/restart the window and rebind the theme watcher to it.
    async fn normal(&self) -> Result<LaunchOutcome> {
        let window_existed = self.window_exists().await;
        if window_existed == Some(true) {
            tracing::info!("Window '{}' is open, restarting it", self.config.class);
        }

        // Unconditional: kill is a no-op when nothing matches
        let killed = self.kill_application().await;
        self.retire_watcher().await;

        let pid = self.launch_application(false).await?;
        let watcher = self.start_watcher().await;

        Ok(LaunchOutcome {
            mode: LaunchMode::Normal,
            pid,
            window_existed,
            killed,
            watcher,
        })
    }

    /// Kill then launch, strictly in that order.
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self, prewarm: bool) -> Result<(u32, KillReport)> {
        let killed = self.kill_application().await;
        let pid = self.launch_application(prewarm).await?;
        Ok((pid, killed))
    }

    /// Terminate every instance of the class and forget its record.
    pub async fn kill_application(&self) -> KillReport {
        self.transition(LifecycleState::Stopping);
        let report = self.processes.kill().await;
        if let Err(e) = self.registry.remove(Role::Application) {
            tracing::warn!("Failed to clear application record: {}", e);
        }
        self.transition(LifecycleState::Absent);
        report
    }

    /// Spawn the application, record it and place its window.
    pub async fn launch_application(&self, prewarm: bool) -> Result<u32> {
        self.transition(LifecycleState::Starting);
        let pid = match self.processes.launch(prewarm) {
            Ok(pid) => pid,
            Err(e) => {
                self.transition(LifecycleState::Absent);
                return Err(e);
            }
        };
        self.registry.write(Role::Application, pid)?;
        self.transition(LifecycleState::Running);
        self.place_window().await;
        Ok(pid)
    }

    async fn retire_watcher(&self) {
        if let Err(e) = self.stop_watcher().await {
            tracing::warn!("Failed to stop previous theme watcher: {}", e);
        }
    }
}
