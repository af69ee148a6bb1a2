use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gell", version)]
#[command(about = "Gell launcher - single-instance window with theme auto-restart")]
pub struct Cli {
    /// Config file path (defaults to ~/.config/gell/supervisor.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Start a hidden, ready instance without a theme watcher
    #[arg(long)]
    pub prewarm: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse argv, rejecting `--prewarm` together with a subcommand.
    pub fn parse_checked() -> Self {
        Self::parse().check().unwrap_or_else(|e| e.exit())
    }

    pub fn check(self) -> Result<Self, clap::Error> {
        if self.prewarm {
            if let Some(command) = &self.command {
                let message = format!("--prewarm cannot be used with '{}'", command.name());
                return Err(Self::command().error(ErrorKind::ArgumentConflict, message));
            }
        }
        Ok(self)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stop the launcher window and its theme watcher
    Stop,
    /// Show the launcher window and theme watcher state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    ///
    /// Example: gell completions bash > ~/.local/share/bash-completion/completions/gell
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Background theme watcher (started by `gell`, not meant to be run by hand)
    #[command(hide = true)]
    Watch {
        /// Append logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Stop => "stop",
            Commands::Status { .. } => "status",
            Commands::Completions { .. } => "completions",
            Commands::Watch { .. } => "watch",
        }
    }
}
