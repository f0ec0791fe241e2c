//! Start/stop state machine with per-app single-flight.

use crate::error::{FleetError, Result};
use crate::model::{ComposeAction, ToggleAction, ToggleOutcome};
use crate::registry::AppRegistry;
use crate::runtime::{ComposeCommand, ComposeRunner, ProcessOutput};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

/// One lock per app name. Acquisition never waits: a busy app is rejected.
struct ActionGate {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ActionGate {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn try_acquire(&self, name: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // An entry only the map still references belongs to no running action.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.try_lock_owned().map_err(|_| FleetError::InFlight {
            name: name.to_string(),
        })
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct ToggleController {
    registry: Arc<AppRegistry>,
    runner: Arc<dyn ComposeRunner>,
    action_timeout: Duration,
    probe_timeout: Duration,
    gate: ActionGate,
}

impl ToggleController {
    pub fn new(
        registry: Arc<AppRegistry>,
        runner: Arc<dyn ComposeRunner>,
        action_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            runner,
            action_timeout,
            probe_timeout,
            gate: ActionGate::new(),
        }
    }

    /// Start a stopped app or stop a running one, judged by the cached status.
    ///
    /// The status is committed only after the compose call exits 0, and it is set to
    /// the intended value without re-probing. Callers wanting ground truth follow up
    /// with `AppRegistry::refresh_one`.
    #[instrument(skip(self))]
    pub async fn toggle(&self, name: &str) -> Result<ToggleOutcome> {
        if self.registry.get(name).await.is_none() {
            return Err(FleetError::not_found(name));
        }
        let _guard = self.gate.try_acquire(name).await?;

        // Re-read under the gate so the decision uses the latest committed status.
        let app = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| FleetError::not_found(name))?;
        let action = ToggleAction::for_status(app.status());
        let command = match action {
            ToggleAction::Started => ComposeCommand::Up,
            ToggleAction::Stopped => ComposeCommand::Down,
        };

        info!(action = action.as_str(), directory = %app.directory.display(), "toggling");
        let out = self
            .runner
            .run(&app.directory, command, self.action_timeout)
            .await?;
        self.check(name, action.compose_action(), &out)?;

        let committed = self
            .registry
            .commit_status(name, &app.directory, action.target_status())
            .await;
        info!(action = action.as_str(), committed, "toggle succeeded");

        Ok(ToggleOutcome {
            name: name.to_string(),
            action,
            committed,
        })
    }

    /// `compose restart`. Leaves the cached status alone; shares the toggle gate.
    #[instrument(skip(self))]
    pub async fn restart(&self, name: &str) -> Result<()> {
        let app = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| FleetError::not_found(name))?;
        let _guard = self.gate.try_acquire(name).await?;

        let command = ComposeCommand::Restart;
        let out = self
            .runner
            .run(&app.directory, command, self.action_timeout)
            .await?;
        self.check(name, command.action(), &out)?;
        info!("restarted");
        Ok(())
    }

    /// Last `lines` log lines across the project's containers.
    #[instrument(skip(self))]
    pub async fn logs(&self, name: &str, lines: usize) -> Result<String> {
        let app = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| FleetError::not_found(name))?;

        let command = ComposeCommand::Logs { tail: lines };
        let out = self
            .runner
            .run(&app.directory, command, self.probe_timeout)
            .await?;
        self.check(name, command.action(), &out)?;
        Ok(out.stdout)
    }

    fn check(&self, name: &str, action: ComposeAction, out: &ProcessOutput) -> Result<()> {
        let timeout = match action {
            ComposeAction::Ps | ComposeAction::Logs => self.probe_timeout,
            _ => self.action_timeout,
        };
        check_output(name, action, out, timeout)
    }
}

fn check_output(
    name: &str,
    action: ComposeAction,
    out: &ProcessOutput,
    timeout: Duration,
) -> Result<()> {
    if out.timed_out {
        warn!(%name, %action, "compose timed out");
        return Err(FleetError::Timeout {
            name: name.to_string(),
            action,
            after: timeout,
        });
    }
    if out.exit_code != 0 {
        warn!(%name, %action, exit_code = out.exit_code, stderr = %out.stderr.trim(), "compose failed");
        return Err(FleetError::ActionFailed {
            name: name.to_string(),
            action,
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}
