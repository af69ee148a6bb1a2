use super::core::{Supervisor, WatcherOutcome, WATCHER_LOCK_TIMEOUT};
use crate::config::Parser;
use crate::error::Result;
use crate::process::KillReport;
use crate::state::Role;
use crate::watch::{self, DebouncedChanges, ThemeWatcher, WATCHER_CONFIG_FILE, WATCHER_LOG_FILE};
use tokio_util::sync::CancellationToken;

/// Why the watcher event loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Cancelled,
    /// The supervised application died; nothing left to restart.
    ApplicationGone,
    /// The change source closed.
    SourceClosed,
}

impl Supervisor {
    /// Start a background watcher bound to the current application.
    ///
    /// Any previous watcher is stopped first. Never fails the launch: an
    /// unusable theme path or spawn error yields `Unavailable` and no
    /// watcher record.
    #[tracing::instrument(skip(self))]
    pub async fn start_watcher(&self) -> WatcherOutcome {
        if let Err(e) = self.stop_watcher().await {
            tracing::warn!("Failed to stop previous theme watcher: {}", e);
        }

        let unavailable = |e: crate::Error| {
            tracing::warn!("Theme auto-restart disabled: {}", e);
            WatcherOutcome::Unavailable {
                reason: e.to_string(),
            }
        };

        if let Err(e) = ThemeWatcher::probe(&self.config.theme_path) {
            return unavailable(e);
        }

        let state_dir = &self.config.state_dir;
        let config_path = state_dir.join(WATCHER_CONFIG_FILE);
        if let Err(e) = Parser::new().write_config(&config_path, &self.config) {
            return unavailable(e);
        }

        let log_path = state_dir.join(WATCHER_LOG_FILE);
        let pid = match watch::spawn_watcher(&self.watcher_program, &config_path, &log_path) {
            Ok(pid) => pid,
            Err(e) => return unavailable(e),
        };
        if let Err(e) = self.registry.write(Role::Watcher, pid) {
            return unavailable(e);
        }
        WatcherOutcome::Started { pid }
    }

    /// Stop the recorded watcher, if any. Idempotent.
    pub async fn stop_watcher(&self) -> Result<Option<KillReport>> {
        self.stop_watcher_keeping(&[]).await
    }

    pub(super) async fn stop_watcher_keeping(&self, keep: &[u32]) -> Result<Option<KillReport>> {
        watch::stop_watcher(
            &self.registry,
            &self.config.class,
            keep,
            self.config.kill_grace,
        )
        .await
    }

    /// Body of the background watcher process.
    ///
    /// Subscribes to the theme file and restarts the application once per
    /// burst of changes until cancelled or the application is gone. Clears
    /// its own watcher record on the way out.
    pub async fn run_watcher(&self, cancel: CancellationToken) -> Result<WatchExit> {
        let changes = ThemeWatcher::new(&self.config.theme_path)?.debounced(self.config.debounce);
        tracing::info!(
            "Watching {} for theme changes (PID {})",
            self.config.theme_path.display(),
            std::process::id()
        );
        let exit = self.watch_loop(changes, cancel).await;

        if let Err(e) = self.registry.remove_if(Role::Watcher, std::process::id()) {
            tracing::warn!("Failed to clear watcher record: {}", e);
        }
        tracing::info!("Theme watcher exiting: {:?}", exit);
        Ok(exit)
    }

    /// Drive restarts from `changes` until cancelled or the application dies.
    pub async fn watch_loop(
        &self,
        mut changes: DebouncedChanges,
        cancel: CancellationToken,
    ) -> WatchExit {
        loop {
            let burst = tokio::select! {
                _ = cancel.cancelled() => return WatchExit::Cancelled,
                burst = changes.next_burst() => burst,
            };
            let Some(events) = burst else {
                return WatchExit::SourceClosed;
            };

            match self.on_theme_change(events).await {
                Ok(true) => {}
                Ok(false) => return WatchExit::ApplicationGone,
                Err(e) => tracing::warn!("Restart after theme change failed: {}", e),
            }
        }
    }

    /// Returns false when the application is gone and the watcher should exit.
    async fn on_theme_change(&self, events: usize) -> Result<bool> {
        let alive = self
            .registry
            .read_live(Role::Application)
            .map(|record| self.processes.is_alive(record.pid))
            .unwrap_or(false);
        if !alive {
            tracing::info!("Application '{}' is gone", self.config.class);
            return Ok(false);
        }

        let _lock = self.lock(WATCHER_LOCK_TIMEOUT).await?;
        let (pid, killed) = self.restart(false).await?;
        tracing::info!(
            "Theme changed ({} event(s)), restarted '{}' as PID {} (killed {:?})",
            events,
            self.config.class,
            pid,
            killed.signalled
        );
        Ok(true)
    }
}
