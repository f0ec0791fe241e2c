//! Scripted in-memory compose runtime for tests.

use super::{ComposeCommand, ComposeRunner, ProcessOutput, TIMEOUT_EXIT_CODE};
use crate::error::Result;
use crate::model::ComposeAction;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub directory: PathBuf,
    pub command: ComposeCommand,
}

#[derive(Default)]
struct FakeProject {
    services: Vec<String>,
    // None: no containers exist (never started, or brought down).
    running: Option<bool>,
}

#[derive(Default)]
struct FakeState {
    projects: HashMap<PathBuf, FakeProject>,
    raw_ps: HashMap<PathBuf, String>,
    failures: HashMap<(PathBuf, ComposeAction), (i32, String)>,
    timeouts: Vec<(PathBuf, ComposeAction)>,
    invocations: Vec<Invocation>,
    in_flight: HashMap<PathBuf, usize>,
    max_in_flight: HashMap<PathBuf, usize>,
}

/// Behaves like a compose runtime: `up` creates running containers, `down` removes them.
#[derive(Default)]
pub(crate) struct FakeRunner {
    state: Mutex<FakeState>,
    delay: Duration,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to `up`, `down` and `restart` to widen race windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Register a project; `running` of `None` means no containers exist yet.
    pub fn add_project(&self, dir: &Path, services: &[&str], running: Option<bool>) {
        let mut st = self.state.lock().unwrap();
        st.projects.insert(
            dir.to_path_buf(),
            FakeProject {
                services: services.iter().map(|s| s.to_string()).collect(),
                running,
            },
        );
    }

    pub fn set_ps_output(&self, dir: &Path, raw: &str) {
        let mut st = self.state.lock().unwrap();
        st.raw_ps.insert(dir.to_path_buf(), raw.to_string());
    }

    pub fn fail(&self, dir: &Path, action: ComposeAction, exit_code: i32, stderr: &str) {
        let mut st = self.state.lock().unwrap();
        st.failures
            .insert((dir.to_path_buf(), action), (exit_code, stderr.to_string()));
    }

    pub fn time_out(&self, dir: &Path, action: ComposeAction) {
        let mut st = self.state.lock().unwrap();
        st.timeouts.push((dir.to_path_buf(), action));
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    pub fn count(&self, action: ComposeAction) -> usize {
        self.invocations()
            .iter()
            .filter(|i| i.command.action() == action)
            .count()
    }

    pub fn max_in_flight(&self, dir: &Path) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_in_flight
            .get(dir)
            .copied()
            .unwrap_or(0)
    }

    fn respond(&self, directory: &Path, command: ComposeCommand) -> ProcessOutput {
        let mut st = self.state.lock().unwrap();
        let action = command.action();
        let key = (directory.to_path_buf(), action);

        if st.timeouts.contains(&key) {
            return ProcessOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                stderr: "timed out".into(),
                timed_out: true,
                ..Default::default()
            };
        }
        if let Some((exit_code, stderr)) = st.failures.get(&key).cloned() {
            return ProcessOutput {
                exit_code,
                stderr,
                ..Default::default()
            };
        }

        if command == ComposeCommand::Ps {
            if let Some(raw) = st.raw_ps.get(directory) {
                return ProcessOutput {
                    stdout: raw.clone(),
                    ..Default::default()
                };
            }
        }

        let Some(project) = st.projects.get_mut(directory) else {
            return ProcessOutput {
                exit_code: 1,
                stderr: "no configuration file provided: not found".into(),
                ..Default::default()
            };
        };

        let stdout = match command {
            ComposeCommand::Ps => ps_lines(directory, project),
            ComposeCommand::Up => {
                project.running = Some(true);
                String::new()
            }
            ComposeCommand::Down => {
                project.running = None;
                String::new()
            }
            ComposeCommand::Restart => String::new(),
            ComposeCommand::Logs { tail } => (0..tail.min(3))
                .map(|i| format!("log line {i}\n"))
                .collect(),
        };
        ProcessOutput {
            stdout,
            ..Default::default()
        }
    }
}

fn ps_lines(directory: &Path, project: &FakeProject) -> String {
    let Some(running) = project.running else {
        return String::new();
    };
    let prefix = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let state = if running { "running" } else { "exited" };
    project
        .services
        .iter()
        .map(|svc| {
            format!(
                "{{\"ID\":\"{prefix}-{svc}\",\"Name\":\"{prefix}-{svc}-1\",\"Service\":\"{svc}\",\"State\":\"{state}\"}}\n"
            )
        })
        .collect()
}

#[async_trait]
impl ComposeRunner for FakeRunner {
    async fn run(
        &self,
        directory: &Path,
        command: ComposeCommand,
        _timeout: Duration,
    ) -> Result<ProcessOutput> {
        {
            let mut st = self.state.lock().unwrap();
            st.invocations.push(Invocation {
                directory: directory.to_path_buf(),
                command,
            });
            let n = st.in_flight.entry(directory.to_path_buf()).or_insert(0);
            *n += 1;
            let current = *n;
            let max = st.max_in_flight.entry(directory.to_path_buf()).or_insert(0);
            *max = (*max).max(current);
        }

        let mutating = matches!(
            command,
            ComposeCommand::Up | ComposeCommand::Down | ComposeCommand::Restart
        );
        if mutating && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let out = self.respond(directory, command);
        if let Some(n) = self.state.lock().unwrap().in_flight.get_mut(directory) {
            *n -= 1;
        }
        Ok(out)
    }
}
