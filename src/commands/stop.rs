use crate::output::UserOutput;
use gell_supervisor::Supervisor;

pub async fn run_stop(supervisor: &Supervisor, out: &dyn UserOutput) -> anyhow::Result<()> {
    let outcome = supervisor.stop_all().await?;

    if outcome.is_noop() {
        out.status("Nothing running");
        return Ok(());
    }
    if let Some(watcher) = &outcome.watcher {
        if let Some(pid) = watcher.signalled.first() {
            out.status(&format!("Stopped theme watcher (PID {})", pid));
        }
    }
    if !outcome.application.is_noop() {
        out.status(&format!(
            "Stopped '{}' ({} process(es){})",
            supervisor.config().class,
            outcome.application.signalled.len(),
            if outcome.application.forced.is_empty() {
                String::new()
            } else {
                format!(", {} forced", outcome.application.forced.len())
            }
        ));
    }
    Ok(())
}
