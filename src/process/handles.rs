use crate::state::Role;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Child;

/// Owned child handles for the processes this invocation spawned.
///
/// Processes started by other invocations have no handle here and fall back
/// to signal probes and command-line matching.
#[derive(Debug, Default)]
pub struct ProcessHandles {
    children: Mutex<HashMap<Role, Child>>,
}

impl ProcessHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `child` for `role`, returning the handle it replaced.
    pub fn insert(&self, role: Role, child: Child) -> Option<Child> {
        self.children.lock().insert(role, child)
    }

    pub fn pid(&self, role: Role) -> Option<u32> {
        self.children.lock().get(&role).and_then(Child::id)
    }

    /// Liveness from the handle: `None` when there is no handle for `role`.
    ///
    /// An exited child is reaped and its handle dropped.
    pub fn is_running(&self, role: Role) -> Option<bool> {
        let mut children = self.children.lock();
        let child = children.get_mut(&role)?;
        match child.try_wait() {
            Ok(None) => Some(true),
            Ok(Some(status)) => {
                tracing::debug!("{} exited with {}", role, status);
                children.remove(&role);
                Some(false)
            }
            Err(e) => {
                tracing::debug!("try_wait failed for {}: {}", role, e);
                None
            }
        }
    }

    /// Liveness of `pid` if we hold its handle.
    pub fn is_running_pid(&self, pid: u32) -> Option<bool> {
        let role = {
            let children = self.children.lock();
            children
                .iter()
                .find(|(_, child)| child.id() == Some(pid))
                .map(|(role, _)| *role)?
        };
        self.is_running(role)
    }

    pub fn take(&self, role: Role) -> Option<Child> {
        self.children.lock().remove(&role)
    }

    /// Wait up to `timeout` for the child of `role` to exit.
    ///
    /// Returns true when the child has exited (or there was no handle).
    /// A child still running after the timeout is put back.
    pub async fn wait_exit(&self, role: Role, timeout: Duration) -> bool {
        let Some(mut child) = self.take(role) else {
            return true;
        };
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("{} exited with {}", role, status);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!("wait failed for {}: {}", role, e);
                true
            }
            Err(_) => {
                self.insert(role, child);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[tokio::test]
    async fn tracks_liveness_through_exit() {
        let handles = ProcessHandles::new();
        assert_eq!(handles.is_running(Role::Application), None);

        let child = Command::new("sleep").arg("0.2").spawn().unwrap();
        let pid = child.id().unwrap();
        handles.insert(Role::Application, child);

        assert_eq!(handles.pid(Role::Application), Some(pid));
        assert_eq!(handles.is_running(Role::Application), Some(true));
        assert_eq!(handles.is_running_pid(pid), Some(true));
        assert_eq!(handles.is_running_pid(pid + 1), None);

        assert!(handles.wait_exit(Role::Application, Duration::from_secs(5)).await);
        assert_eq!(handles.is_running(Role::Application), None);
    }

    #[tokio::test]
    async fn wait_exit_times_out_and_keeps_handle() {
        let handles = ProcessHandles::new();
        let child = Command::new("sleep").arg("5").spawn().unwrap();
        handles.insert(Role::Application, child);

        assert!(!handles.wait_exit(Role::Application, Duration::from_millis(50)).await);
        assert_eq!(handles.is_running(Role::Application), Some(true));

        let mut child = handles.take(Role::Application).unwrap();
        child.kill().await.unwrap();
    }
}
