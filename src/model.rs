use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a single container as reported by `compose ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Exited,
    Restarting,
    Paused,
    Unknown,
}

impl ContainerState {
    /// Map the runtime's `State` text; anything unrecognised is `Unknown`.
    pub fn from_runtime(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            _ => ContainerState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
            ContainerState::Restarting => "restarting",
            ContainerState::Paused => "paused",
            ContainerState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
}

/// One compose project discovered under a fleet root.
///
/// The container counts and `status` are derived from `containers` and only change
/// through [`Application::apply_probe`], except for the intended-status commit made
/// after a successful toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub name: String,
    pub directory: PathBuf,
    pub manifest: PathBuf,
    containers: Vec<Container>,
    running_count: usize,
    total_count: usize,
    status: bool,
    probe_error: Option<String>,
}

impl Application {
    pub fn new(name: String, directory: PathBuf, manifest: PathBuf) -> Self {
        Self {
            name,
            directory,
            manifest,
            containers: Vec::new(),
            running_count: 0,
            total_count: 0,
            status: false,
            probe_error: None,
        }
    }

    /// Replace the observed containers and recompute every derived field.
    pub fn apply_probe(&mut self, containers: Vec<Container>, probe_error: Option<String>) {
        self.running_count = containers
            .iter()
            .filter(|c| c.state == ContainerState::Running)
            .count();
        self.total_count = containers.len();
        self.status = self.running_count > 0;
        self.containers = containers;
        self.probe_error = probe_error;
    }

    /// Record the status a confirmed start/stop is expected to produce.
    pub(crate) fn commit_status(&mut self, running: bool) {
        self.status = running;
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn running_count(&self) -> usize {
        self.running_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn probe_error(&self) -> Option<&str> {
        self.probe_error.as_deref()
    }

    pub fn summary(&self) -> AppSummary {
        AppSummary {
            name: self.name.clone(),
            status: self.status,
            running_count: self.running_count,
            total_count: self.total_count,
        }
    }
}

/// The per-app record handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub name: String,
    pub status: bool,
    pub running_count: usize,
    pub total_count: usize,
}

/// Compose subcommand family, used to label invocations in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeAction {
    Ps,
    Up,
    Down,
    Restart,
    Logs,
}

impl fmt::Display for ComposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComposeAction::Ps => "ps",
            ComposeAction::Up => "up",
            ComposeAction::Down => "down",
            ComposeAction::Restart => "restart",
            ComposeAction::Logs => "logs",
        };
        f.write_str(s)
    }
}

/// What a toggle did, derived from the cached status at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Started,
    Stopped,
}

impl ToggleAction {
    /// A stopped app gets started, a running app gets stopped.
    pub fn for_status(running: bool) -> Self {
        if running {
            ToggleAction::Stopped
        } else {
            ToggleAction::Started
        }
    }

    pub fn compose_action(self) -> ComposeAction {
        match self {
            ToggleAction::Started => ComposeAction::Up,
            ToggleAction::Stopped => ComposeAction::Down,
        }
    }

    /// Status the app should have once the action succeeded.
    pub fn target_status(self) -> bool {
        matches!(self, ToggleAction::Started)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToggleAction::Started => "started",
            ToggleAction::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub name: String,
    pub action: ToggleAction,
    /// False when the app vanished from the catalog before the commit.
    pub committed: bool,
}

/// Events streamed from the panel controller to the panel.
#[derive(Debug, Clone)]
pub enum FleetEvent {
    Catalog {
        apps: Vec<AppSummary>,
        failure: Option<String>,
    },
    AppUpdated(AppSummary),
    ActionStarted {
        name: String,
        label: &'static str,
    },
    ActionFinished {
        name: String,
    },
    Logs {
        name: String,
        text: String,
    },
    Info(InfoEvent),
}

/// Structured info events consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Toggled { name: String, action: ToggleAction },
    Restarted { name: String },
    Failed { name: String, reason: String },
    WaitingForActions(usize),
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Toggled { name, action } => format!("{} {}", name, action.as_str()),
            InfoEvent::Restarted { name } => format!("{} restarted", name),
            InfoEvent::Failed { name, reason } => format!("{}: {}", name, reason),
            InfoEvent::WaitingForActions(n) => {
                format!("Waiting for {} action(s) to finish…", n)
            }
        }
    }
}
