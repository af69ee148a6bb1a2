use crate::output::UserOutput;
use gell_supervisor::{PidRecord, Supervisor};

pub async fn run_status(
    supervisor: &Supervisor,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let report = supervisor.status().await;

    if json {
        // Machine-readable output ignores --quiet
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let window = match report.window {
        Some(true) => "open",
        Some(false) => "closed",
        None => "unknown",
    };
    out.status(&format!("Class:       {}", report.class));
    out.status(&format!("State dir:   {}", report.state_dir.display()));
    out.status(&format!("Application: {}", describe(report.application.as_ref())));
    out.status(&format!("Watcher:     {}", describe(report.watcher.as_ref())));
    out.status(&format!("Window:      {}", window));
    Ok(())
}

fn describe(record: Option<&PidRecord>) -> String {
    match record {
        Some(record) => match record.started_at {
            Some(started) => format!(
                "running (PID {}, since {})",
                record.pid,
                started.with_timezone(&chrono::Local).format("%H:%M:%S")
            ),
            None => format!("running (PID {})", record.pid),
        },
        None => "not running".to_string(),
    }
}
