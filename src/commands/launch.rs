use crate::output::UserOutput;
use gell_supervisor::{LaunchMode, Supervisor, WatcherOutcome};

pub async fn run_launch(
    supervisor: &Supervisor,
    mode: LaunchMode,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let outcome = supervisor.launch(mode).await?;
    let class = &supervisor.config().class;

    if !outcome.killed.is_noop() {
        out.status(&format!(
            "Stopped previous '{}' instance (PID {})",
            class,
            join_pids(&outcome.killed.signalled)
        ));
    }

    match mode {
        LaunchMode::Prewarm => {
            out.status(&format!("Pre-warmed '{}' (PID {})", class, outcome.pid));
        }
        LaunchMode::Normal => {
            out.status(&format!("Launched '{}' (PID {})", class, outcome.pid));
            match &outcome.watcher {
                WatcherOutcome::Started { pid } => {
                    out.status(&format!("Theme watcher running (PID {})", pid));
                }
                WatcherOutcome::Unavailable { reason } => {
                    out.warning(&format!("Theme auto-restart unavailable: {}", reason));
                }
                WatcherOutcome::NotRequested => {}
            }
        }
    }
    Ok(())
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
