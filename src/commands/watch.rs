use gell_supervisor::Supervisor;
use tokio_util::sync::CancellationToken;

/// Entry point of the detached background watcher.
///
/// Runs until SIGTERM/SIGINT, or until the application it restarts is gone.
pub async fn run_watch(supervisor: &Supervisor) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    supervisor.run_watcher(cancel).await?;
    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Failed to create SIGINT handler: {}", e);
                None
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Failed to create SIGTERM handler: {}", e);
                None
            }
        };

        tokio::select! {
            _ = async {
                match sigint.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending::<Option<()>>().await,
                }
            } => tracing::info!("Received SIGINT"),
            _ = async {
                match sigterm.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending::<Option<()>>().await,
                }
            } => tracing::info!("Received SIGTERM"),
        }
        cancel.cancel();
    });
}
