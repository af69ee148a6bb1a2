use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const LOCK_FILE_NAME: &str = "supervisor.lock";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Advisory lock serializing supervisor invocations.
///
/// Two hotkey presses in quick succession would otherwise both see "no
/// window" and double-spawn. The lock is released when this value is dropped.
#[derive(Debug)]
pub struct InvocationLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl InvocationLock {
    /// Wait up to `timeout` for the exclusive lock in `dir`.
    ///
    /// Returns `Ok(None)` when the lock is still held by someone else after
    /// the timeout; callers proceed without it.
    pub async fn acquire(dir: &Path, timeout: Duration) -> Result<Option<Self>> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::Filesystem(format!("Failed to open lock file: {}", e)))?;

        let deadline = Instant::now() + timeout;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    // Owner pid, for debugging only
                    let _ = file.set_len(0);
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!("Acquired invocation lock {:?}", path);
                    return Ok(Some(Self { file, path }));
                }
                Err(e) if Instant::now() >= deadline => {
                    let owner = std::fs::read_to_string(&path).unwrap_or_default();
                    warn!(
                        "Invocation lock held by PID {} for over {:?} ({}); proceeding without it",
                        owner.trim(),
                        timeout,
                        e
                    );
                    return Ok(None);
                }
                Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = InvocationLock::acquire(dir.path(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = InvocationLock::acquire(dir.path(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(second.is_none());

        drop(first);
        let third = InvocationLock::acquire(dir.path(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn waiter_gets_lock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let held = InvocationLock::acquire(dir.path(), Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();

        let path = dir.path().to_path_buf();
        let waiter = tokio::spawn(async move {
            InvocationLock::acquire(&path, Duration::from_secs(5)).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(held);

        let acquired = waiter.await.unwrap().unwrap();
        assert!(acquired.is_some());
    }
}
