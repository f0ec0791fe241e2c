//! Application discovery and the in-memory catalog.
//!
//! A discovery pass replaces the whole catalog. Between passes, single apps are
//! re-probed in place with `refresh_one` or have their status committed after a
//! successful toggle. Locks are never held across a compose invocation.

use crate::error::{FleetError, Result};
use crate::model::{Application, Container};
use crate::runtime::{parse_ps_output, ComposeCommand, ComposeRunner};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub apps: Vec<Application>,
    /// Set when a root could not be scanned.
    pub failure: Option<String>,
    /// Directories left out because an earlier one already claimed their name.
    pub duplicates: Vec<PathBuf>,
}

struct Candidate {
    name: String,
    directory: PathBuf,
    manifest: PathBuf,
}

pub struct AppRegistry {
    roots: Vec<PathBuf>,
    manifest_names: Vec<String>,
    probe_timeout: Duration,
    runner: Arc<dyn ComposeRunner>,
    catalog: RwLock<Vec<Application>>,
}

impl AppRegistry {
    pub fn new(
        roots: Vec<PathBuf>,
        manifest_names: Vec<String>,
        probe_timeout: Duration,
        runner: Arc<dyn ComposeRunner>,
    ) -> Self {
        Self {
            roots,
            manifest_names,
            probe_timeout,
            runner,
            catalog: RwLock::new(Vec::new()),
        }
    }

    /// Scan every root, probe each project found and replace the catalog.
    ///
    /// A root that cannot be read contributes no apps and is reported in
    /// `Discovery::failure`; it is never an error to the caller.
    #[instrument(skip(self))]
    pub async fn discover(&self) -> Discovery {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        let mut duplicates = Vec::new();
        let mut seen = HashSet::new();

        for root in &self.roots {
            match self.scan_root(root).await {
                Ok(found) => {
                    for c in found {
                        if seen.insert(c.name.clone()) {
                            candidates.push(c);
                        } else {
                            warn!(
                                name = %c.name,
                                directory = %c.directory.display(),
                                "duplicate app name, keeping the first directory"
                            );
                            duplicates.push(c.directory);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "discovery failed");
                    failures.push(e.to_string());
                }
            }
        }

        let apps = join_all(candidates.into_iter().map(|c| async move {
            let mut app = Application::new(c.name, c.directory, c.manifest);
            let (containers, probe_error) = self.probe(&app.directory).await;
            app.apply_probe(containers, probe_error);
            app
        }))
        .await;

        let failure = (!failures.is_empty()).then(|| failures.join("; "));
        info!(apps = apps.len(), failed = failure.is_some(), "discovery finished");

        *self.catalog.write().await = apps.clone();

        Discovery {
            apps,
            failure,
            duplicates,
        }
    }

    async fn scan_root(&self, root: &Path) -> Result<Vec<Candidate>> {
        let discovery_err = |source| FleetError::Discovery {
            root: root.to_path_buf(),
            source,
        };
        let root = std::path::absolute(root).map_err(discovery_err)?;
        let mut entries = tokio::fs::read_dir(&root).await.map_err(discovery_err)?;

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_err)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let directory = entry.path();
            // metadata() follows symlinks, so linked project directories count.
            let is_dir = tokio::fs::metadata(&directory)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(manifest) = self.find_manifest(&directory).await {
                debug!(%name, manifest = %manifest.display(), "found compose project");
                found.push(Candidate {
                    name,
                    directory,
                    manifest,
                });
            }
        }
        Ok(found)
    }

    async fn find_manifest(&self, directory: &Path) -> Option<PathBuf> {
        for file in &self.manifest_names {
            let path = directory.join(file);
            if tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                return Some(path);
            }
        }
        None
    }

    /// Run `ps` for one project. Failures become an empty or partial container list
    /// plus a reason, never an error.
    async fn probe(&self, directory: &Path) -> (Vec<Container>, Option<String>) {
        match self
            .runner
            .run(directory, ComposeCommand::Ps, self.probe_timeout)
            .await
        {
            Ok(out) if out.success() => (parse_ps_output(&out.stdout), None),
            Ok(out) => {
                let reason = if out.timed_out {
                    format!(
                        "ps timed out after {}",
                        humantime::format_duration(self.probe_timeout)
                    )
                } else {
                    format!("ps exited with {}: {}", out.exit_code, out.stderr.trim())
                };
                warn!(directory = %directory.display(), %reason, "probe failed");
                (parse_ps_output(&out.stdout), Some(reason))
            }
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "probe failed");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }

    pub async fn list(&self) -> Vec<Application> {
        self.catalog.read().await.clone()
    }

    pub async fn get(&self, name: &str) -> Option<Application> {
        self.catalog
            .read()
            .await
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }

    /// Re-probe one known app and update it in place; does not rescan the roots.
    #[instrument(skip(self))]
    pub async fn refresh_one(&self, name: &str) -> Result<Application> {
        let directory = self
            .get(name)
            .await
            .ok_or_else(|| FleetError::not_found(name))?
            .directory;

        let (containers, probe_error) = self.probe(&directory).await;

        let mut catalog = self.catalog.write().await;
        // A discovery may have replaced the catalog while we were probing.
        let app = catalog
            .iter_mut()
            .find(|a| a.name == name && a.directory == directory)
            .ok_or_else(|| FleetError::not_found(name))?;
        app.apply_probe(containers, probe_error);
        Ok(app.clone())
    }

    /// Commit the status a confirmed action produced. Returns false, changing nothing,
    /// when `name` no longer maps to `directory` in the current catalog.
    pub async fn commit_status(&self, name: &str, directory: &Path, running: bool) -> bool {
        let mut catalog = self.catalog.write().await;
        match catalog
            .iter_mut()
            .find(|a| a.name == name && a.directory == directory)
        {
            Some(app) => {
                app.commit_status(running);
                true
            }
            None => {
                debug!(%name, "app left the catalog before commit");
                false
            }
        }
    }
}
