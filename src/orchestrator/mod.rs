mod builder;
mod core;
mod lifecycle;
mod watcher;

pub use builder::SupervisorBuilder;
pub use core::*;
pub use watcher::WatchExit;
