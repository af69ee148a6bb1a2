use super::types::{PidRecord, Role, SupervisorState};
use super::atomic_write;
use crate::error::{Error, Result};
use crate::process::table;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed pid records, one file per [`Role`].
///
/// Records are written atomically and read optimistically: a record whose
/// process is gone (or whose pid was recycled) is treated exactly like a
/// missing record.
#[derive(Debug, Clone)]
pub struct PidRegistry {
    dir: PathBuf,
}

impl PidRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, role: Role) -> PathBuf {
        self.dir.join(role.file_name())
    }

    /// Persist `pid` for `role`, replacing any previous record.
    pub fn write(&self, role: Role, pid: u32) -> Result<PidRecord> {
        let record = PidRecord::new(role, pid);
        let json = serde_json::to_string(&record)?;
        atomic_write(&self.path(role), format!("{}\n", json).as_bytes())?;
        tracing::debug!("Recorded {} pid {}", role, pid);
        Ok(record)
    }

    /// The raw record, stale or not.
    pub fn read_record(&self, role: Role) -> Result<Option<PidRecord>> {
        let path = self.path(role);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Filesystem(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(PidRecord::parse(role, &contents))
    }

    /// The recorded pid, stale or not. Unreadable records read as `None`.
    pub fn read(&self, role: Role) -> Option<u32> {
        match self.read_record(role) {
            Ok(record) => record.map(|r| r.pid),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// The record, only if its process is alive and is still the process
    /// that was recorded.
    pub fn read_live(&self, role: Role) -> Option<PidRecord> {
        let record = match self.read_record(role) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("{}", e);
                return None;
            }
        };

        if !Self::is_alive(record.pid) {
            tracing::debug!("Stale {} record: pid {} is not running", role, record.pid);
            return None;
        }
        if let Some(started_at) = record.started_at {
            if !table::started_near(record.pid, started_at) {
                tracing::debug!("Stale {} record: pid {} was reused", role, record.pid);
                return None;
            }
        }
        Some(record)
    }

    /// Delete the record for `role`. Missing records are fine.
    pub fn remove(&self, role: Role) -> Result<()> {
        let path = self.path(role);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {} record", role);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Filesystem(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Delete the record only if it still names `pid`.
    ///
    /// Lets an exiting watcher clear its own record without clobbering the
    /// record of a successor that has already replaced it.
    pub fn remove_if(&self, role: Role, pid: u32) -> Result<bool> {
        if self.read(role) == Some(pid) {
            self.remove(role)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_alive(pid: u32) -> bool {
        table::is_alive(pid)
    }

    pub fn snapshot(&self) -> SupervisorState {
        SupervisorState {
            application: self.read_live(Role::Application),
            watcher: self.read_live(Role::Watcher),
        }
    }
}
