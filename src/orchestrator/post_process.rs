//! Post-action processing.
//!
//! A successful toggle commits the intended status without looking at the runtime.
//! Presentation layers that want ground truth afterwards come through here to issue
//! the explicit re-probe.

use super::Fleet;
use crate::model::AppSummary;

/// State to show after an action, ready for presentation layers.
pub(crate) struct ProcessedAction {
    pub summary: Option<AppSummary>,
    pub messages: Vec<String>,
}

/// Re-probe `name` when `refresh` is set, otherwise report the cached record.
pub(crate) async fn process_action_completion(
    fleet: &Fleet,
    name: &str,
    refresh: bool,
) -> ProcessedAction {
    let mut messages = Vec::new();

    let summary = if refresh {
        match fleet.refresh(name).await {
            Ok(s) => Some(s),
            Err(e) => {
                messages.push(format!("Refresh failed: {e}"));
                fleet.get_app(name).await.ok()
            }
        }
    } else {
        fleet.get_app(name).await.ok()
    };

    if let Some(s) = summary.as_ref() {
        if refresh && s.total_count > 0 && s.running_count < s.total_count {
            messages.push(format!(
                "{}: only {}/{} containers running",
                s.name, s.running_count, s.total_count
            ));
        }
    }

    ProcessedAction { summary, messages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::runtime::testing::FakeRunner;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_refresh_after_toggle_reports_ground_truth() {
        let root = tempdir().unwrap();
        let dir = root.path().join("web");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("compose.yml"), "services: {}\n").unwrap();
        let runner = Arc::new(FakeRunner::new());
        runner.add_project(&dir, &["app", "db"], None);
        let cfg = FleetConfig {
            roots: vec![root.path().to_path_buf()],
            ..FleetConfig::default()
        };
        let fleet = Fleet::new(&cfg, runner);
        fleet.discover().await;
        fleet.toggle("web").await.unwrap();

        let cached = process_action_completion(&fleet, "web", false).await;
        let cached = cached.summary.unwrap();
        assert!(cached.status);
        assert_eq!(cached.total_count, 0);

        let processed = process_action_completion(&fleet, "web", true).await;
        let summary = processed.summary.unwrap();
        assert_eq!((summary.running_count, summary.total_count), (2, 2));
        assert!(processed.messages.is_empty());
    }

    #[tokio::test]
    async fn test_missing_app_yields_no_summary() {
        let root = tempdir().unwrap();
        let cfg = FleetConfig {
            roots: vec![root.path().to_path_buf()],
            ..FleetConfig::default()
        };
        let fleet = Fleet::new(&cfg, Arc::new(FakeRunner::new()));
        fleet.discover().await;

        let processed = process_action_completion(&fleet, "gone", true).await;
        assert!(processed.summary.is_none());
        assert_eq!(processed.messages.len(), 1);
    }
}
