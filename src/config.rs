//! Fleet configuration: defaults, optional JSON file, CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Manifest file names recognised by the compose convention, in lookup order.
pub const DEFAULT_MANIFESTS: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

pub const DEFAULT_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Directories whose immediate children are compose projects.
    pub roots: Vec<PathBuf>,
    pub manifest_names: Vec<String>,
    /// Argv prefix for the compose tool, e.g. `["sudo", "docker", "compose"]`.
    pub compose_command: Vec<String>,
    /// Bound for `up`, `down` and `restart`.
    #[serde(with = "humantime_serde")]
    pub action_timeout: Duration,
    /// Bound for `ps` and `logs`.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    pub log_lines: usize,
    /// How often the panel re-probes every app.
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            roots: dirs::home_dir().into_iter().collect(),
            manifest_names: DEFAULT_MANIFESTS.iter().map(|s| s.to_string()).collect(),
            compose_command: vec!["docker".into(), "compose".into()],
            action_timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(30),
            log_lines: DEFAULT_LOG_LINES,
            refresh_interval: Duration::from_secs(10),
        }
    }
}

impl FleetConfig {
    /// Default config file location, `<config_dir>/compose-fleet/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("compose-fleet").join("config.json"))
    }

    /// Load from `path`. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Reject values the runtime cannot honour, such as a zero panel refresh period.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("refresh_interval", self.refresh_interval),
            ("action_timeout", self.action_timeout),
            ("probe_timeout", self.probe_timeout),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                anyhow::bail!("{field} must be greater than zero");
            }
        }
        Ok(())
    }

    /// Load the explicit file if given, else the default file if it exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Split a `--compose-cmd` value such as `"sudo docker compose"` into argv.
pub fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"roots":["/srv/apps"],"compose_command":["sudo","docker","compose"],"action_timeout":"5m"}"#,
        )
        .unwrap();

        let cfg = FleetConfig::load(&path).unwrap();
        assert_eq!(cfg.roots, vec![PathBuf::from("/srv/apps")]);
        assert_eq!(cfg.compose_command, ["sudo", "docker", "compose"]);
        assert_eq!(cfg.action_timeout, Duration::from_secs(300));
        assert_eq!(cfg.probe_timeout, Duration::from_secs(30));
        assert_eq!(cfg.log_lines, DEFAULT_LOG_LINES);
        assert_eq!(cfg.manifest_names.len(), DEFAULT_MANIFESTS.len());
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = FleetConfig::resolve(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parse config"));
    }

    #[test]
    fn test_zero_refresh_interval_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"refresh_interval":"0s"}"#).unwrap();
        let err = FleetConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("refresh_interval must be greater than zero"));

        let cfg = FleetConfig {
            probe_timeout: Duration::ZERO,
            ..FleetConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(FleetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("  sudo docker   compose "),
            ["sudo", "docker", "compose"]
        );
        assert!(split_command("").is_empty());
    }
}
