//! Text output for CLI mode.
//!
//! Formats app listings and detail views as plain lines.

use crate::metrics;
use crate::model::{AppSummary, Application};
use crate::registry::Discovery;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn status_label(app: &AppSummary) -> &'static str {
    if app.status {
        "ON"
    } else {
        "OFF"
    }
}

pub(crate) fn containers_label(app: &AppSummary) -> String {
    if app.total_count == 0 {
        "no containers".to_string()
    } else {
        format!("{}/{}", app.running_count, app.total_count)
    }
}

/// Aligned table of apps followed by fleet totals.
pub(crate) fn build_list_summary(apps: &[AppSummary]) -> TextSummary {
    let mut lines = Vec::new();
    if apps.is_empty() {
        lines.push("No compose applications found.".to_string());
        return TextSummary { lines };
    }

    let width = apps
        .iter()
        .map(|a| a.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    lines.push(format!("{:<width$}  {:<7}CONTAINERS", "NAME", "STATUS"));
    for app in apps {
        lines.push(format!(
            "{:<width$}  {:<7}{}",
            app.name,
            status_label(app),
            containers_label(app)
        ));
    }

    let totals = metrics::compute_totals(apps);
    lines.push(String::new());
    lines.push(format!(
        "{}/{} apps running, {}/{} containers running",
        totals.apps_running, totals.apps, totals.containers_running, totals.containers
    ));
    TextSummary { lines }
}

/// Detail view of one app with its containers.
pub(crate) fn build_app_detail(app: &Application) -> TextSummary {
    let summary = app.summary();
    let mut lines = vec![
        format!("Name:       {}", app.name),
        format!("Directory:  {}", app.directory.display()),
        format!("Manifest:   {}", app.manifest.display()),
        format!(
            "Status:     {} ({})",
            status_label(&summary),
            containers_label(&summary)
        ),
    ];
    if let Some(err) = app.probe_error() {
        lines.push(format!("Probe:      {err}"));
    }
    for c in app.containers() {
        let service = c.service.as_deref().unwrap_or("-");
        let status = c.status_text.as_deref().unwrap_or("");
        lines.push(format!(
            "  {:<10} {:<24} {:<12} {}",
            c.state.as_str(),
            c.name,
            service,
            status
        ));
    }
    TextSummary { lines }
}

/// Lines describing a discovery pass.
pub(crate) fn build_discovery_summary(discovery: &Discovery) -> TextSummary {
    let mut lines = vec![format!("Discovered {} app(s)", discovery.apps.len())];
    for app in &discovery.apps {
        lines.push(format!("  {:<20} {}", app.name, app.directory.display()));
    }
    for dir in &discovery.duplicates {
        lines.push(format!("Skipped duplicate name: {}", dir.display()));
    }
    if let Some(failure) = discovery.failure.as_deref() {
        lines.push(format!("Discovery failed: {failure}"));
    }
    TextSummary { lines }
}
