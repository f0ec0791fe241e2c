use crate::model::AppSummary;
use serde::Serialize;

/// Fleet-wide counts shown under listings and in the panel header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetTotals {
    pub apps: usize,
    pub apps_running: usize,
    pub containers: usize,
    pub containers_running: usize,
}

/// Compute fleet totals from per-app summaries
pub fn compute_totals(apps: &[AppSummary]) -> FleetTotals {
    apps.iter().fold(FleetTotals::default(), |mut t, app| {
        t.apps += 1;
        if app.status {
            t.apps_running += 1;
        }
        t.containers += app.total_count;
        t.containers_running += app.running_count;
        t
    })
}
