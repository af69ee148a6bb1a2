#![allow(unused_assignments)]

//! # Gell supervisor
//!
//! Single-instance launcher for the Gell terminal window, with automatic
//! restart when the desktop theme changes.
//!
//! ## Features
//!
//! - **Single instance**: at most one launcher window (matched by window
//!   class) and at most one theme watcher exist at any time
//! - **Toggle/restart**: invoking the launcher while its window is open
//!   replaces the window with a fresh one
//! - **Pre-warm**: start a hidden, ready instance at login
//! - **Theme auto-restart**: a detached watcher restarts the window once per
//!   burst of writes to the theme file
//! - **Crash tolerant state**: pid records are re-validated against the live
//!   process table on every read
//!
//! ## Quick Start
//!
//! ```no_run
//! use gell_supervisor::{LaunchMode, Parser, Supervisor};
//!
//! # async fn example() -> Result<(), gell_supervisor::Error> {
//! let (config, path) = Parser::new().resolve(None)?;
//! let supervisor = Supervisor::builder()
//!     .config(config)
//!     .config_path(path)
//!     .build()?;
//!
//! supervisor.launch(LaunchMode::Normal).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! Each invocation is a short-lived process; the only long-lived one is the
//! theme watcher. They coordinate through pid-record files and an advisory
//! lock in the state directory:
//! - Foreground invocations and watcher restarts serialize on the lock
//! - Kill always completes before launch
//! - A previous watcher is always stopped before a new one starts

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod state;
pub mod watch;
pub mod window;

// Re-export commonly used types
pub use config::{Parser, SupervisorConfig, WindowManagerKind};
pub use error::{Error, Result};
pub use orchestrator::{
    LaunchMode, LaunchOutcome, StatusReport, StopOutcome, Supervisor, SupervisorBuilder,
    WatchExit, WatcherOutcome,
};
pub use process::{KillReport, ProcessLifecycleManager};
pub use state::{LifecycleState, PidRecord, PidRegistry, Role, SupervisorState};
pub use watch::{DebouncedChanges, ThemeWatcher};
pub use window::{Client, WindowManager};
