//! The fleet surface consumed by the CLI and the panel.

use super::toggle::ToggleController;
use crate::config::FleetConfig;
use crate::error::{FleetError, Result};
use crate::model::{AppSummary, Application, ToggleOutcome};
use crate::registry::{AppRegistry, Discovery};
use crate::runtime::{ComposeCli, ComposeRunner};
use std::sync::Arc;
use tracing::debug;

pub struct Fleet {
    registry: Arc<AppRegistry>,
    toggles: ToggleController,
    log_lines: usize,
}

impl Fleet {
    pub fn new(cfg: &FleetConfig, runner: Arc<dyn ComposeRunner>) -> Self {
        let registry = Arc::new(AppRegistry::new(
            cfg.roots.clone(),
            cfg.manifest_names.clone(),
            cfg.probe_timeout,
            runner.clone(),
        ));
        let toggles = ToggleController::new(
            registry.clone(),
            runner,
            cfg.action_timeout,
            cfg.probe_timeout,
        );
        Self {
            registry,
            toggles,
            log_lines: cfg.log_lines,
        }
    }

    /// Fleet driving the real compose tool named in the config.
    pub fn from_config(cfg: &FleetConfig) -> Self {
        let cli = ComposeCli::new(&cfg.compose_command);
        debug!(compose = %cli.display(), roots = ?cfg.roots, "fleet configured");
        Self::new(cfg, Arc::new(cli))
    }

    pub async fn discover(&self) -> Discovery {
        self.registry.discover().await
    }

    pub async fn list_apps(&self) -> Vec<AppSummary> {
        self.registry
            .list()
            .await
            .iter()
            .map(Application::summary)
            .collect()
    }

    pub async fn get_app(&self, name: &str) -> Result<AppSummary> {
        Ok(self.inspect(name).await?.summary())
    }

    /// Full record including containers.
    pub async fn inspect(&self, name: &str) -> Result<Application> {
        let name = validate(name)?;
        self.registry
            .get(name)
            .await
            .ok_or_else(|| FleetError::not_found(name))
    }

    pub async fn refresh(&self, name: &str) -> Result<AppSummary> {
        let name = validate(name)?;
        Ok(self.registry.refresh_one(name).await?.summary())
    }

    pub async fn toggle(&self, name: &str) -> Result<ToggleOutcome> {
        self.toggles.toggle(validate(name)?).await
    }

    /// Recent logs; `lines` defaults to the configured count.
    pub async fn logs(&self, name: &str, lines: Option<usize>) -> Result<String> {
        let lines = lines.unwrap_or(self.log_lines);
        self.toggles.logs(validate(name)?, lines).await
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        self.toggles.restart(validate(name)?).await
    }
}

fn validate(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(FleetError::not_found(name));
    }
    Ok(name)
}
