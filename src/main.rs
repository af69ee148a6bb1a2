mod cli;
mod commands;
mod output;

use clap::CommandFactory;
use cli::{Cli, Commands};
use gell_supervisor::{Error as GellError, LaunchMode, Parser as ConfigParser, Supervisor};
use std::path::Path;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(gell_error) = e.downcast_ref::<GellError>() {
            eprintln!("Error: {}", gell_error);
            if let Some(suggestion) = gell_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_checked();

    let log_file = match &cli.command {
        Some(Commands::Watch { log_file }) => log_file.clone(),
        _ => None,
    };
    init_tracing(log_file.as_deref(), cli.quiet)?;

    // ── Commands that need NO config ──────────────────────────────────
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    // ── Load config ─────────────────────────────────────────────────
    let (config, config_path) = ConfigParser::new().resolve(cli.config.as_deref())?;
    match &config_path {
        Some(path) => tracing::debug!("Loaded config from {}", path.display()),
        None => tracing::debug!("No config file, using defaults"),
    }

    let supervisor = Supervisor::builder()
        .config(config)
        .config_path(config_path)
        .build()?;
    let out = output::for_flags(cli.quiet);

    match cli.command {
        None => {
            let mode = if cli.prewarm {
                LaunchMode::Prewarm
            } else {
                LaunchMode::Normal
            };
            commands::run_launch(&supervisor, mode, out).await
        }
        Some(Commands::Stop) => commands::run_stop(&supervisor, out).await,
        Some(Commands::Status { json }) => commands::run_status(&supervisor, json, out).await,
        Some(Commands::Watch { .. }) => commands::run_watch(&supervisor).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

fn init_tracing(log_file: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let default_level = if quiet { "error" } else { "info" };

    if let Some(log_path) = log_file {
        // Background watcher: no terminal to write to
        if let Some(dir) = log_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
