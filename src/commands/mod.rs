mod launch;
mod status;
mod stop;
mod watch;

pub use launch::run_launch;
pub use status::run_status;
pub use stop::run_stop;
pub use watch::run_watch;
