//! Panel command loop.
//!
//! Runs every panel command on its own task so a multi-second `up` never blocks the
//! panel or other apps, and streams results back as events.

use super::{process_action_completion, Fleet};
use crate::model::{FleetEvent, InfoEvent};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, warn};

/// Commands emitted by the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PanelCommand {
    Discover,
    Refresh(String),
    Toggle(String),
    Restart(String),
    Logs(String),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Discover,
    Other,
}

/// Serve panel commands until `Quit`, then wait for in-flight actions to finish.
pub(crate) async fn run_controller(
    fleet: Arc<Fleet>,
    refresh_interval: Duration,
    event_tx: UnboundedSender<FleetEvent>,
    mut cmd_rx: UnboundedReceiver<PanelCommand>,
) -> Result<()> {
    let mut tasks: JoinSet<TaskKind> = JoinSet::new();
    let mut discovering = true;
    tasks.spawn(handle_command(
        fleet.clone(),
        PanelCommand::Discover,
        event_tx.clone(),
    ));

    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the initial discovery already covers it.
    ticker.tick().await;

    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(PanelCommand::Quit) | None => {
                        quit_pending = true;
                        // Never abort an `up`/`down` halfway; let in-flight tasks finish.
                        if tasks.is_empty() {
                            break;
                        }
                        let _ = event_tx.send(FleetEvent::Info(InfoEvent::WaitingForActions(
                            tasks.len(),
                        )));
                    }
                    Some(PanelCommand::Discover) if discovering => {
                        debug!("discovery already running");
                    }
                    Some(cmd) => {
                        if cmd == PanelCommand::Discover {
                            discovering = true;
                        }
                        tasks.spawn(handle_command(fleet.clone(), cmd, event_tx.clone()));
                    }
                }
            }
            Some(joined) = tasks.join_next() => {
                match joined {
                    Ok(TaskKind::Discover) => discovering = false,
                    Ok(TaskKind::Other) => {}
                    Err(e) => {
                        warn!(error = %e, "panel task failed");
                        let _ = event_tx.send(FleetEvent::Info(InfoEvent::Message(format!(
                            "Task failed: {e}"
                        ))));
                    }
                }
                if quit_pending && tasks.is_empty() {
                    break;
                }
            }
            _ = ticker.tick(), if !quit_pending && !discovering => {
                discovering = true;
                tasks.spawn(handle_command(
                    fleet.clone(),
                    PanelCommand::Discover,
                    event_tx.clone(),
                ));
            }
        }
    }

    Ok(())
}

async fn handle_command(
    fleet: Arc<Fleet>,
    cmd: PanelCommand,
    event_tx: UnboundedSender<FleetEvent>,
) -> TaskKind {
    match cmd {
        PanelCommand::Discover => {
            let discovery = fleet.discover().await;
            for dir in &discovery.duplicates {
                let _ = event_tx.send(FleetEvent::Info(InfoEvent::Message(format!(
                    "Skipped duplicate app name at {}",
                    dir.display()
                ))));
            }
            let _ = event_tx.send(FleetEvent::Catalog {
                apps: discovery.apps.iter().map(|a| a.summary()).collect(),
                failure: discovery.failure,
            });
            return TaskKind::Discover;
        }
        PanelCommand::Refresh(name) => match fleet.refresh(&name).await {
            Ok(summary) => {
                let _ = event_tx.send(FleetEvent::AppUpdated(summary));
            }
            Err(e) => {
                let _ = event_tx.send(FleetEvent::Info(InfoEvent::Failed {
                    name,
                    reason: e.to_string(),
                }));
            }
        },
        PanelCommand::Toggle(name) => {
            let _ = event_tx.send(FleetEvent::ActionStarted {
                name: name.clone(),
                label: "toggling",
            });
            let result = fleet.toggle(&name).await;
            let refresh = match result {
                Ok(outcome) => {
                    let _ = event_tx.send(FleetEvent::Info(InfoEvent::Toggled {
                        name: name.clone(),
                        action: outcome.action,
                    }));
                    true
                }
                Err(e) => {
                    let _ = event_tx.send(FleetEvent::Info(InfoEvent::Failed {
                        name: name.clone(),
                        reason: e.to_string(),
                    }));
                    false
                }
            };
            finish_action(&fleet, &name, refresh, &event_tx).await;
        }
        PanelCommand::Restart(name) => {
            let _ = event_tx.send(FleetEvent::ActionStarted {
                name: name.clone(),
                label: "restarting",
            });
            let refresh = match fleet.restart(&name).await {
                Ok(()) => {
                    let _ = event_tx.send(FleetEvent::Info(InfoEvent::Restarted {
                        name: name.clone(),
                    }));
                    true
                }
                Err(e) => {
                    let _ = event_tx.send(FleetEvent::Info(InfoEvent::Failed {
                        name: name.clone(),
                        reason: e.to_string(),
                    }));
                    false
                }
            };
            finish_action(&fleet, &name, refresh, &event_tx).await;
        }
        PanelCommand::Logs(name) => match fleet.logs(&name, None).await {
            Ok(text) => {
                let _ = event_tx.send(FleetEvent::Logs { name, text });
            }
            Err(e) => {
                let _ = event_tx.send(FleetEvent::Info(InfoEvent::Failed {
                    name,
                    reason: e.to_string(),
                }));
            }
        },
        PanelCommand::Quit => {}
    }
    TaskKind::Other
}

async fn finish_action(
    fleet: &Fleet,
    name: &str,
    refresh: bool,
    event_tx: &UnboundedSender<FleetEvent>,
) {
    let processed = process_action_completion(fleet, name, refresh).await;
    for msg in processed.messages {
        let _ = event_tx.send(FleetEvent::Info(InfoEvent::Message(msg)));
    }
    if let Some(summary) = processed.summary {
        let _ = event_tx.send(FleetEvent::AppUpdated(summary));
    }
    let _ = event_tx.send(FleetEvent::ActionFinished {
        name: name.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::model::{ComposeAction, ToggleAction};
    use crate::runtime::testing::FakeRunner;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_toggle_then_quit_waits_for_action() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("web");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("compose.yaml"), "services: {}\n").unwrap();
        let runner = Arc::new(FakeRunner::with_delay(Duration::from_millis(100)));
        runner.add_project(&dir, &["app"], None);
        let cfg = FleetConfig {
            roots: vec![root.path().to_path_buf()],
            ..FleetConfig::default()
        };
        let fleet = Arc::new(Fleet::new(&cfg, runner.clone()));

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(
            fleet,
            Duration::from_secs(3600),
            event_tx,
            cmd_rx,
        ));

        // Wait for the initial catalog before toggling.
        loop {
            if let Some(FleetEvent::Catalog { apps, .. }) = event_rx.recv().await {
                assert_eq!(apps.len(), 1);
                break;
            }
        }
        cmd_tx.send(PanelCommand::Toggle("web".into())).unwrap();
        cmd_tx.send(PanelCommand::Quit).unwrap();
        handle.await.unwrap().unwrap();

        let mut toggled = false;
        let mut finished = false;
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                FleetEvent::Info(InfoEvent::Toggled { action, .. }) => {
                    assert_eq!(action, ToggleAction::Started);
                    toggled = true;
                }
                FleetEvent::ActionFinished { name } => {
                    assert_eq!(name, "web");
                    finished = true;
                }
                _ => {}
            }
        }
        assert!(toggled && finished);
        assert_eq!(runner.count(ComposeAction::Up), 1);
    }
}
