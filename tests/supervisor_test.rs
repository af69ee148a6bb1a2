//! Supervisor lifecycle against real processes.
//!
//! A shell script stands in for the terminal: it records every launch and
//! then idles with `--class <class>` on its command line, which is all the
//! supervisor needs to find and kill it. A process-table-backed window
//! manager stands in for Hyprland.

use async_trait::async_trait;
use gell_supervisor::process::table;
use gell_supervisor::watch::ThemeChange;
use gell_supervisor::{
    Client, DebouncedChanges, Error, LaunchMode, LifecycleState, Role, Supervisor,
    SupervisorConfig, SupervisorState, WatchExit, WatcherOutcome, WindowManager, WindowManagerKind,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Window manager whose client list is the process table.
#[derive(Default)]
struct ProcessTableWm {
    moves: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl WindowManager for ProcessTableWm {
    async fn clients(&self) -> gell_supervisor::Result<Vec<Client>> {
        Ok(Vec::new())
    }

    async fn exists(&self, class: &str) -> gell_supervisor::Result<bool> {
        Ok(!table::find_by_class(class).is_empty())
    }

    async fn move_to_workspace(&self, class: &str, workspace: &str) -> gell_supervisor::Result<()> {
        self.moves
            .lock()
            .unwrap()
            .push((class.to_string(), workspace.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "process-table"
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    config: SupervisorConfig,
    wm: Arc<ProcessTableWm>,
    supervisor: Supervisor,
}

impl Fixture {
    fn new(name: &str) -> Self {
        Self::with(name, |_| {})
    }

    fn with(name: &str, customize: impl FnOnce(&mut SupervisorConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let terminal = write_fake_terminal(dir.path());
        let class = format!(
            "gell-test-{}-{}-{}",
            name,
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::SeqCst)
        );

        let mut config = SupervisorConfig {
            class,
            terminal: terminal.to_string_lossy().into_owned(),
            command: "app".to_string(),
            args: vec!["--from-test".to_string()],
            // No such directory: the theme watcher is unavailable by default
            theme_path: dir.path().join("missing").join("colors-kitty.conf"),
            state_dir: dir.path().join("state"),
            window_manager: WindowManagerKind::None,
            ..Default::default()
        };
        customize(&mut config);

        let wm = Arc::new(ProcessTableWm::default());
        let supervisor = Supervisor::builder()
            .config(config.clone())
            .window_manager(wm.clone())
            .watcher_program(env!("CARGO_BIN_EXE_gell"))
            .build()
            .expect("Failed to build supervisor");

        Self {
            dir,
            config,
            wm,
            supervisor,
        }
    }

    fn launches(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("launches"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn running(&self) -> Vec<u32> {
        table::find_by_class(&self.config.class)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        for pid in table::find_by_class(&self.config.class) {
            let _ = nix::sys::signal::killpg(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGKILL,
            );
        }
    }
}

fn write_fake_terminal(dir: &Path) -> PathBuf {
    let path = dir.join("fake-terminal");
    let launches = dir.join("launches");
    let script = format!(
        "#!/bin/sh\necho \"$$ $*\" >> '{}'\nsleep 300 &\nwait\n",
        launches.display()
    );
    fs::write(&path, script).expect("Failed to write fake terminal");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}

fn theme_change() -> ThemeChange {
    ThemeChange {
        path: PathBuf::from("colors-kitty.conf"),
        kind: notify::EventKind::Any,
    }
}

#[tokio::test]
async fn test_normal_mode_from_nothing_leaves_one_instance() {
    let f = Fixture::new("normal");

    let outcome = f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    assert_eq!(f.running(), vec![outcome.pid]);
    assert!(outcome.killed.is_noop());
    let record = f.supervisor.registry().read_live(Role::Application).unwrap();
    assert_eq!(record.pid, outcome.pid);
    assert_eq!(f.supervisor.lifecycle(), LifecycleState::Running);
    assert!(f.wm.exists(&f.config.class).await.unwrap());
    assert_eq!(
        f.wm.moves.lock().unwrap().as_slice(),
        [(f.config.class.clone(), "special:gell".to_string())]
    );
}

#[tokio::test]
async fn test_terminal_receives_fixed_geometry() {
    let f = Fixture::new("geometry");
    f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    let launches = f.launches();
    assert_eq!(launches.len(), 1);
    let line = &launches[0];
    assert!(line.contains(&format!("--class {} --title Gell", f.config.class)));
    assert!(line.contains("-o window_padding_width=0 -o window_margin_width=0"));
    assert!(line.contains("-o initial_window_width=80c -o initial_window_height=25c"));
    assert!(line.contains("-o remember_window_size=no"));
    assert!(line.ends_with("-e app --from-test"));
}

#[tokio::test]
async fn test_normal_mode_with_open_window_restarts_it() {
    let f = Fixture::new("toggle");

    let first = f.supervisor.launch(LaunchMode::Normal).await.unwrap();
    let second = f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    assert_eq!(second.window_existed, Some(true));
    assert_eq!(second.killed.signalled, vec![first.pid]);
    assert_ne!(first.pid, second.pid);
    assert!(!f.supervisor.processes().is_alive(first.pid));
    assert_eq!(f.running(), vec![second.pid]);
    assert_eq!(f.launches().len(), 2);
}

#[tokio::test]
async fn test_kill_then_exists_is_false() {
    let f = Fixture::new("kill");

    // Nothing running: no-op
    assert!(f.supervisor.kill_application().await.is_noop());
    assert!(!f.wm.exists(&f.config.class).await.unwrap());

    f.supervisor.launch(LaunchMode::Normal).await.unwrap();
    let report = f.supervisor.kill_application().await;
    assert_eq!(report.signalled.len(), 1);
    assert!(!f.wm.exists(&f.config.class).await.unwrap());
    assert_eq!(f.supervisor.registry().read(Role::Application), None);
    assert_eq!(f.supervisor.lifecycle(), LifecycleState::Absent);

    // Idempotent
    assert!(f.supervisor.kill_application().await.is_noop());
}

#[tokio::test]
async fn test_restart_replaces_the_instance() {
    let f = Fixture::new("restart");
    let before = f.supervisor.launch(LaunchMode::Normal).await.unwrap().pid;

    let (after, killed) = f.supervisor.restart(false).await.unwrap();

    assert_eq!(killed.signalled, vec![before]);
    assert!(f.supervisor.processes().is_alive(after));
    assert!(!f.supervisor.processes().is_alive(before));
    assert_eq!(f.supervisor.registry().read(Role::Application), Some(after));
}

#[tokio::test]
async fn test_prewarm_leaves_one_instance_and_no_watcher() {
    let f = Fixture::new("prewarm");
    f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    let outcome = f.supervisor.launch(LaunchMode::Prewarm).await.unwrap();

    assert_eq!(outcome.watcher, WatcherOutcome::NotRequested);
    assert_eq!(f.running(), vec![outcome.pid]);
    assert_eq!(f.supervisor.registry().read_live(Role::Watcher), None);
    let launches = f.launches();
    assert!(launches.last().unwrap().ends_with("-e app --from-test --prewarm"));
}

#[tokio::test]
async fn test_missing_theme_directory_launches_without_watcher() {
    let f = Fixture::new("nowatch");

    let outcome = f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    assert!(matches!(outcome.watcher, WatcherOutcome::Unavailable { .. }));
    assert_eq!(f.running(), vec![outcome.pid]);
    assert_eq!(f.supervisor.registry().read(Role::Watcher), None);
    assert!(!f.supervisor.registry().path(Role::Watcher).exists());
}

#[tokio::test]
async fn test_spawn_failure_is_reported_and_records_nothing() {
    let f = Fixture::with("spawnfail", |config| {
        config.terminal = "/nonexistent/gell-test-terminal".to_string();
    });

    let err = f.supervisor.launch(LaunchMode::Normal).await.unwrap_err();

    assert!(matches!(err, Error::SpawnFailure { .. }));
    assert!(err.suggestion().is_some());
    assert_eq!(f.supervisor.registry().read(Role::Application), None);
    assert_eq!(f.supervisor.lifecycle(), LifecycleState::Absent);
}

#[tokio::test]
async fn test_burst_of_theme_changes_restarts_once() {
    let f = Fixture::new("burst");
    let first = f.supervisor.launch(LaunchMode::Normal).await.unwrap().pid;

    let (tx, rx) = mpsc::unbounded_channel();
    let changes = DebouncedChanges::from_channel(rx, Duration::from_millis(100));
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        tx.send(theme_change()).unwrap();
    }

    let exit = {
        let watch = f.supervisor.watch_loop(changes, cancel.clone());
        tokio::pin!(watch);
        let restarted = tokio::select! {
            exit = &mut watch => panic!("watch loop ended early: {:?}", exit),
            done = wait_until(Duration::from_secs(5), || f.launches().len() >= 2) => done,
        };
        assert!(restarted, "theme change did not restart the application");

        // Give a second restart every chance to show up
        tokio::select! {
            exit = &mut watch => panic!("watch loop ended early: {:?}", exit),
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }
        cancel.cancel();
        watch.await
    };

    assert_eq!(exit, WatchExit::Cancelled);
    assert_eq!(f.launches().len(), 2);
    let current = f.supervisor.registry().read(Role::Application).unwrap();
    assert_ne!(current, first);
    assert_eq!(f.running(), vec![current]);
}

#[tokio::test]
async fn test_watch_loop_exits_when_application_is_gone() {
    let f = Fixture::new("gone");
    f.supervisor.launch(LaunchMode::Normal).await.unwrap();
    f.supervisor.kill_application().await;

    let (tx, rx) = mpsc::unbounded_channel();
    let changes = DebouncedChanges::from_channel(rx, Duration::from_millis(50));
    tx.send(theme_change()).unwrap();

    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        f.supervisor.watch_loop(changes, CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(exit, WatchExit::ApplicationGone);
    assert_eq!(f.launches().len(), 1);
    assert!(f.running().is_empty());
}

#[tokio::test]
async fn test_failed_restart_keeps_watch_loop_waiting() {
    let f = Fixture::new("failedrestart");
    f.supervisor.launch(LaunchMode::Normal).await.unwrap();
    fs::remove_file(f.dir.path().join("fake-terminal")).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let changes = DebouncedChanges::from_channel(rx, Duration::from_millis(50));
    for _ in 0..3 {
        tx.send(theme_change()).unwrap();
    }

    let watch = f.supervisor.watch_loop(changes, CancellationToken::new());
    tokio::pin!(watch);

    // The old instance is killed, then the relaunch fails
    let killed = tokio::select! {
        exit = &mut watch => panic!("watch loop ended after a failed restart: {:?}", exit),
        done = wait_until(Duration::from_secs(5), || f.running().is_empty()) => done,
    };
    assert!(killed);
    tokio::select! {
        exit = &mut watch => panic!("watch loop ended after a failed restart: {:?}", exit),
        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
    }
    assert_eq!(f.supervisor.registry().read(Role::Application), None);
    assert_eq!(f.supervisor.lifecycle(), LifecycleState::Absent);

    // Next burst finds nothing to restart
    tx.send(theme_change()).unwrap();
    let exit = tokio::time::timeout(Duration::from_secs(5), watch)
        .await
        .unwrap();
    assert_eq!(exit, WatchExit::ApplicationGone);
    assert_eq!(f.launches().len(), 1);
}

#[tokio::test]
async fn test_stop_all_is_idempotent() {
    let f = Fixture::new("stop");
    f.supervisor.launch(LaunchMode::Normal).await.unwrap();

    let outcome = f.supervisor.stop_all().await.unwrap();
    assert_eq!(outcome.application.signalled.len(), 1);
    assert!(f.running().is_empty());

    let again = f.supervisor.stop_all().await.unwrap();
    assert!(again.is_noop());
    assert_eq!(f.supervisor.registry().snapshot(), SupervisorState::default());
}

#[tokio::test]
async fn test_status_reports_live_state() {
    let f = Fixture::new("status");

    let idle = f.supervisor.status().await;
    assert_eq!(idle.lifecycle, LifecycleState::Absent);
    assert_eq!(idle.application, None);
    assert_eq!(idle.window, Some(false));

    let pid = f.supervisor.launch(LaunchMode::Normal).await.unwrap().pid;
    let running = f.supervisor.status().await;
    assert_eq!(running.lifecycle, LifecycleState::Running);
    assert_eq!(running.application.map(|r| r.pid), Some(pid));
    assert_eq!(running.window, Some(true));
    assert_eq!(running.watcher, None);
}
