//! Persistent supervisor state.
//!
//! The supervisor keeps no shared memory between invocations. What a second
//! invocation needs to know (which application and watcher are running) is
//! projected into small pid-record files inside the state directory:
//!
//! - `gell.pid` - the supervised application
//! - `gell-watcher.pid` - the background theme watcher
//! - `supervisor.lock` - advisory lock serializing invocations
//!
//! Records are written through [`atomic_write`] so a reader never sees a
//! half-written file, and every read is checked against the live process
//! table.

mod lock;
mod registry;
mod types;

pub use lock::{InvocationLock, LOCK_FILE_NAME};
pub use registry::PidRegistry;
pub use types::{LifecycleState, PidRecord, Role, SupervisorState};

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` via a sibling temp file and rename.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Filesystem(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Filesystem(format!("{} has no file name", path.display())))?
        .to_string_lossy();
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let mut file = fs::File::create(&tmp)
        .map_err(|e| Error::Filesystem(format!("Failed to create {}: {}", tmp.display(), e)))?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::Filesystem(format!("Failed to replace {}: {}", path.display(), e))
    })
}
