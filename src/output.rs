/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// `--quiet` (used from hotkey bindings) can silence them. Errors are not
/// routed through here: `main` always prints them.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Launched gell (PID 1234)")
    fn status(&self, message: &str);

    /// Warning message (e.g., "Theme auto-restart unavailable")
    fn warning(&self, message: &str);
}

/// Standard CLI output: status to stdout, warnings to stderr.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }
}

/// Suppresses all output.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
}

pub fn for_flags(quiet: bool) -> &'static dyn UserOutput {
    if quiet {
        &QuietOutput
    } else {
        &CliOutput
    }
}
