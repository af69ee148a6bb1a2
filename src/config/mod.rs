//! Configuration parsing and types.
//!
//! - `types` - `SupervisorConfig` and its defaults
//! - `duration` - "100ms" / "2s" duration strings
//! - `parser` - locating, loading and writing `supervisor.yaml`

mod duration;
mod parser;
mod types;

pub use duration::*;
pub use parser::*;
pub use types::*;
