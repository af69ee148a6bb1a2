//! Theme file watching.
//!
//! The theme file is rewritten by an external tool (pywal) whenever the
//! wallpaper changes. The launcher only picks up colors at startup, so every
//! completed write has to turn into one restart of the application.
//!
//! # Usage
//!
//! ```ignore
//! use gell_supervisor::watch::ThemeWatcher;
//!
//! let mut changes = ThemeWatcher::new(&theme_path)?.debounced(debounce);
//! while let Some(events) = changes.next_burst().await {
//!     println!("theme changed ({} events)", events);
//! }
//! ```
//!
//! The parent directory is watched rather than the file itself so saves that
//! replace the file by rename are still seen.

mod process;

pub use process::{spawn_watcher, stop_watcher, WATCHER_CONFIG_FILE, WATCHER_LOG_FILE};

use crate::error::{Error, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// A completed write to the watched file.
#[derive(Debug, Clone)]
pub struct ThemeChange {
    pub path: PathBuf,
    pub kind: EventKind,
}

/// True for events that mean "the file now holds new, complete contents".
///
/// Raw data modifications are ignored: a writer may still be mid-way.
pub fn is_write_completion(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Both))
            | EventKind::Create(_)
    )
}

/// Whether `event` concerns the file called `file_name`.
///
/// For a two-path rename only the destination counts.
fn concerns(event: &Event, file_name: &OsString) -> bool {
    let is_named = |p: &PathBuf| p.file_name() == Some(file_name.as_os_str());
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(is_named).unwrap_or(false)
        }
        _ => event.paths.iter().any(is_named),
    }
}

/// Live subscription to write-completion events for one file.
pub struct ThemeWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<ThemeChange>,
    path: PathBuf,
}

impl std::fmt::Debug for ThemeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ThemeWatcher {
    /// Check that `path` can be watched, without keeping a subscription.
    pub fn probe(path: &Path) -> Result<()> {
        Self::new(path).map(|_| ())
    }

    /// Subscribe to write-completion events for `path`.
    ///
    /// The file itself may not exist yet; its directory must.
    pub fn new(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| Error::CapabilityUnavailable {
            path: path.display().to_string(),
            reason,
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| unavailable("path does not name a file".to_string()))?
            .to_os_string();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(unavailable(format!(
                "directory {} does not exist",
                parent.display()
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handler = move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if !is_write_completion(&event.kind) || !concerns(&event, &file_name) {
                    return;
                }
                tracing::debug!("Theme event {:?} on {:?}", event.kind, event.paths);
                let path = event.paths.last().cloned().unwrap_or_default();
                // Receiver gone means the watcher is shutting down
                let _ = tx.send(ThemeChange {
                    path,
                    kind: event.kind,
                });
            }
            Err(e) => tracing::warn!("File watch error: {}", e),
        };

        let mut watcher = notify::recommended_watcher(handler)
            .map_err(|e| unavailable(format!("cannot create watcher: {}", e)))?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| unavailable(format!("cannot watch {}: {}", parent.display(), e)))?;

        tracing::debug!("Watching {} for theme changes", path.display());
        Ok(Self {
            _watcher: watcher,
            rx,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next raw write-completion, undebounced.
    pub async fn next_change(&mut self) -> Option<ThemeChange> {
        self.rx.recv().await
    }

    /// Turn the subscription into a stream of debounced bursts.
    pub fn debounced(self, interval: Duration) -> DebouncedChanges {
        DebouncedChanges {
            rx: self.rx,
            interval,
            _watcher: Some(self._watcher),
        }
    }
}

/// Collapses bursts of changes into single notifications.
///
/// After the first change of a burst the stream waits `interval`, then
/// swallows everything that arrived meanwhile. Each burst yields once.
pub struct DebouncedChanges {
    rx: mpsc::UnboundedReceiver<ThemeChange>,
    interval: Duration,
    _watcher: Option<RecommendedWatcher>,
}

impl DebouncedChanges {
    /// Debounce an arbitrary change source.
    pub fn from_channel(rx: mpsc::UnboundedReceiver<ThemeChange>, interval: Duration) -> Self {
        Self {
            rx,
            interval,
            _watcher: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next burst and return how many changes it collapsed.
    ///
    /// `None` once the change source is gone.
    pub async fn next_burst(&mut self) -> Option<usize> {
        self.rx.recv().await?;
        tokio::time::sleep(self.interval).await;

        let mut count = 1;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        if count > 1 {
            tracing::debug!("Collapsed {} theme events into one", count);
        }
        Some(count)
    }
}
