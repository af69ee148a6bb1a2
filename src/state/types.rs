use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a recorded process plays for the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The supervised terminal window.
    Application,
    /// The background theme watcher.
    Watcher,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Application, Role::Watcher];

    /// File name of this role's pid record inside the state directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Role::Application => "gell.pid",
            Role::Watcher => "gell-watcher.pid",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Application => "application",
            Role::Watcher => "watcher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted (pid, role) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,
    pub role: Role,
    /// Spawn time, used to detect PID reuse. Absent for bare-integer records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl PidRecord {
    pub fn new(role: Role, pid: u32) -> Self {
        Self {
            pid,
            role,
            started_at: Some(Utc::now()),
        }
    }

    /// Parse record file contents: JSON, or a bare pid as older launcher
    /// scripts wrote it.
    pub fn parse(role: Role, contents: &str) -> Option<Self> {
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(pid) = trimmed.parse::<u32>() {
            return Some(Self {
                pid,
                role,
                started_at: None,
            });
        }
        match serde_json::from_str::<PidRecord>(trimmed) {
            Ok(record) if record.role == role => Some(record),
            Ok(record) => {
                tracing::debug!(
                    "Record for {} claims role {}, ignoring",
                    role,
                    record.role
                );
                None
            }
            Err(e) => {
                tracing::debug!("Unparseable {} pid record: {}", role, e);
                None
            }
        }
    }
}

/// Lifecycle of the supervised application instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Absent,
    Starting,
    Running,
    Stopping,
}

impl LifecycleState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// The cycle is Absent -> Starting -> Running -> Stopping -> Absent. A
    /// failed spawn falls back from Starting to Absent, and a kill of an
    /// instance this process never saw start goes Absent -> Stopping.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Absent, Starting)
                | (Absent, Stopping)
                | (Starting, Running)
                | (Starting, Absent)
                | (Running, Stopping)
                | (Stopping, Absent)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Absent => "absent",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Live view of both roles. Stale records are already filtered to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorState {
    pub application: Option<PidRecord>,
    pub watcher: Option<PidRecord>,
}

impl SupervisorState {
    pub fn get(&self, role: Role) -> Option<&PidRecord> {
        match role {
            Role::Application => self.application.as_ref(),
            Role::Watcher => self.watcher.as_ref(),
        }
    }

    pub fn application_state(&self) -> LifecycleState {
        if self.application.is_some() {
            LifecycleState::Running
        } else {
            LifecycleState::Absent
        }
    }
}
