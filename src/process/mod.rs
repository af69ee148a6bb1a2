//! Spawning and terminating the supervised application.
//!
//! The application is a terminal window identified by its class. A process
//! belongs to us when its command line carries `--class <class>`; processes
//! spawned by this invocation are additionally tracked through owned
//! [`ProcessHandles`].

mod handles;
mod kill;
mod launch;
pub mod table;

pub use handles::ProcessHandles;
pub use kill::{probe_alive, signal_process, terminate, wait_for_exit, KillReport, POLL_INTERVAL};
pub use launch::{LaunchSpec, GEOMETRY_OVERRIDES};

use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::state::Role;
use std::time::Duration;

/// Launches and kills the application window for one class.
#[derive(Debug)]
pub struct ProcessLifecycleManager {
    config: SupervisorConfig,
    handles: ProcessHandles,
}

impl ProcessLifecycleManager {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            handles: ProcessHandles::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.config.class
    }

    pub fn grace(&self) -> Duration {
        self.config.kill_grace
    }

    pub fn handles(&self) -> &ProcessHandles {
        &self.handles
    }

    /// Spawn a fresh application window and return its pid.
    ///
    /// Does not wait for the window to appear.
    #[tracing::instrument(skip(self), fields(class = %self.config.class))]
    pub fn launch(&self, prewarm: bool) -> Result<u32> {
        let spec = LaunchSpec::from_config(&self.config, prewarm);
        let child = spec.spawn()?;
        let pid = child.id().ok_or_else(|| Error::SpawnFailure {
            program: spec.terminal.clone(),
            reason: "process exited before its pid could be read".to_string(),
        })?;

        if let Some(mut previous) = self.handles.insert(Role::Application, child) {
            // Replaced handle belongs to an instance that was already killed
            let _ = previous.try_wait();
        }
        tracing::info!("Launched {} (PID {})", spec.terminal, pid);
        Ok(pid)
    }

    /// Liveness of `pid`, from the owned handle when we have one.
    pub fn is_alive(&self, pid: u32) -> bool {
        self.handles
            .is_running_pid(pid)
            .unwrap_or_else(|| probe_alive(pid))
    }

    /// Live pids matching the class, plus our own child if it has not yet
    /// shown up in the process table.
    pub fn matching_pids(&self) -> Vec<u32> {
        let mut pids = table::find_by_class(&self.config.class);
        if let Some(pid) = self.handles.pid(Role::Application) {
            if !pids.contains(&pid) && self.handles.is_running(Role::Application) == Some(true) {
                pids.push(pid);
            }
        }
        pids
    }

    /// Terminate every process matching the class.
    ///
    /// Idempotent: with nothing running the report is empty.
    #[tracing::instrument(skip(self), fields(class = %self.config.class))]
    pub async fn kill(&self) -> KillReport {
        let pids = self.matching_pids();
        if pids.is_empty() {
            tracing::debug!("No running instance to kill");
            return KillReport::default();
        }

        let report = terminate(&pids, self.config.kill_grace, |pid| self.is_alive(pid)).await;
        // Reap our own child so it does not linger as a zombie
        self.handles
            .wait_exit(Role::Application, Duration::from_millis(100))
            .await;
        tracing::info!(
            "Killed {} instance(s) (forced: {})",
            report.signalled.len(),
            report.forced.len()
        );
        report
    }
}
